use shpview_core::geometry::{MapPoint, MapRect};

/// 默认最大深度，与常见 shapefile 工具的四叉树参数一致。
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// 记录范围四叉树。每条记录存放在能够完整容纳其范围的最深节点中，
/// 查询时返回所有与查询范围相交的节点内的记录，因此结果是精确相交集合的超集。
#[derive(Debug)]
pub struct QuadTree {
    root: Node,
    max_depth: usize,
    len: usize,
}

#[derive(Debug)]
struct Node {
    bounds: MapRect,
    ids: Vec<usize>,
    children: Vec<Node>,
}

impl Node {
    fn new(bounds: MapRect) -> Self {
        Self {
            bounds,
            ids: Vec::new(),
            children: Vec::new(),
        }
    }

    fn insert(&mut self, id: usize, item: &MapRect, depth: usize, max_depth: usize) {
        if depth + 1 < max_depth {
            if self.children.is_empty() {
                self.children = quadrants(&self.bounds).into_iter().map(Node::new).collect();
            }
            if let Some(child) = self
                .children
                .iter_mut()
                .find(|child| child.bounds.contains_rect(item))
            {
                child.insert(id, item, depth + 1, max_depth);
                return;
            }
        }
        self.ids.push(id);
    }

    /// 删除不含任何记录的子树，返回自身是否为空。
    fn trim(&mut self) -> bool {
        self.children.retain_mut(|child| !child.trim());
        self.ids.is_empty() && self.children.is_empty()
    }

    fn collect(&self, query: &MapRect, out: &mut Vec<usize>) {
        if !self.bounds.intersects(query) {
            return;
        }
        out.extend_from_slice(&self.ids);
        for child in &self.children {
            child.collect(query, out);
        }
    }

    fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }
}

fn quadrants(bounds: &MapRect) -> [MapRect; 4] {
    let min = bounds.min();
    let max = bounds.max();
    let mid = bounds.center();
    [
        MapRect::new(min, mid),
        MapRect::new(MapPoint::new(mid.x, min.y), MapPoint::new(max.x, mid.y)),
        MapRect::new(MapPoint::new(min.x, mid.y), MapPoint::new(mid.x, max.y)),
        MapRect::new(mid, max),
    ]
}

impl QuadTree {
    /// 以 `(记录索引, 记录范围)` 序列构建四叉树。根节点范围会扩展到覆盖所有记录，
    /// 避免文件头范围不准确时遗漏记录。
    pub fn build(
        extent: MapRect,
        items: impl IntoIterator<Item = (usize, MapRect)>,
        max_depth: usize,
    ) -> Self {
        let items: Vec<(usize, MapRect)> = items.into_iter().collect();
        let root_bounds = items
            .iter()
            .fold(extent, |acc, (_, rect)| acc.union(rect));
        let max_depth = max_depth.max(1);
        let mut root = Node::new(root_bounds);
        for (id, rect) in &items {
            root.insert(*id, rect, 0, max_depth);
        }
        root.trim();
        Self {
            root,
            max_depth,
            len: items.len(),
        }
    }

    /// 返回升序、去重后的候选记录索引。
    pub fn query(&self, query: &MapRect) -> Vec<usize> {
        let mut hits = Vec::new();
        self.root.collect(query, &mut hits);
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    pub fn bounds(&self) -> MapRect {
        self.root.bounds
    }
}
