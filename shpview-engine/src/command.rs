use std::collections::HashMap;

use tracing::debug;

use crate::controller::ViewportController;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// 按空白切分一行命令文本，空行返回 `None`。
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?;
        Some(Self {
            name: name.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }

    /// 以全部参数拼接成的图层名（图层名中允许出现空格）。
    fn layer_name(&self) -> Option<String> {
        if self.args.is_empty() {
            None
        } else {
            Some(self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub controller: &'a mut ViewportController,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(ZoomAllCommand);
        bus.register(ZoomLayerCommand);
        bus.register(WheelZoomCommand::In);
        bus.register(WheelZoomCommand::Out);
        bus.register(RemoveLayerCommand);
        bus.register(RaiseLayerCommand);
        bus.register(LowerLayerCommand);
        bus.register(ClearLayersCommand);
        bus.register(ListLayersCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            debug!(command = %request.name, args = ?request.args, "执行命令");
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    /// 按名称排序的可用命令。
    pub fn available_commands(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_layer_name(command: &str) -> CommandResponse {
    CommandResponse::err(format!("{command} 需要提供图层名"))
}

struct ZoomAllCommand;

impl CommandHandler for ZoomAllCommand {
    fn name(&self) -> &'static str {
        "zoom_all"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if context.controller.zoom_to_all() {
            CommandResponse::ok("视口已缩放到全部图层")
        } else {
            CommandResponse::err("没有可缩放的图层范围")
        }
    }
}

struct ZoomLayerCommand;

impl CommandHandler for ZoomLayerCommand {
    fn name(&self) -> &'static str {
        "zoom_layer"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(name) = request.layer_name() else {
            return missing_layer_name(self.name());
        };
        if context.controller.zoom_to_layer(&name) {
            CommandResponse::ok(format!("视口已缩放到图层 {name}"))
        } else {
            CommandResponse::err(format!("无法缩放到图层 {name}"))
        }
    }
}

/// 以屏幕中心为光标模拟一次滚轮缩放。
enum WheelZoomCommand {
    In,
    Out,
}

impl CommandHandler for WheelZoomCommand {
    fn name(&self) -> &'static str {
        match self {
            WheelZoomCommand::In => "zoom_in",
            WheelZoomCommand::Out => "zoom_out",
        }
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let step = context.controller.wheel_step();
        let delta = match self {
            WheelZoomCommand::In => step,
            WheelZoomCommand::Out => -step,
        };
        let center = context.controller.viewport().screen_rect().center();
        if context.controller.wheel(center, delta) {
            CommandResponse::ok(format!(
                "当前比例 {:.4}",
                context.controller.viewport().scale()
            ))
        } else {
            CommandResponse::err("缩放因子无效")
        }
    }
}

struct RemoveLayerCommand;

impl CommandHandler for RemoveLayerCommand {
    fn name(&self) -> &'static str {
        "remove_layer"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(name) = request.layer_name() else {
            return missing_layer_name(self.name());
        };
        if context.controller.remove_layer(&name) {
            CommandResponse::ok(format!("图层 {name} 已移除"))
        } else {
            CommandResponse::err(format!("图层 {name} 不存在"))
        }
    }
}

struct RaiseLayerCommand;

impl CommandHandler for RaiseLayerCommand {
    fn name(&self) -> &'static str {
        "raise_layer"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(name) = request.layer_name() else {
            return missing_layer_name(self.name());
        };
        if context.controller.raise_layer(&name) {
            CommandResponse::ok(format!("图层 {name} 已上移"))
        } else {
            CommandResponse::err(format!("图层 {name} 不存在或已在顶层"))
        }
    }
}

struct LowerLayerCommand;

impl CommandHandler for LowerLayerCommand {
    fn name(&self) -> &'static str {
        "lower_layer"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(name) = request.layer_name() else {
            return missing_layer_name(self.name());
        };
        if context.controller.lower_layer(&name) {
            CommandResponse::ok(format!("图层 {name} 已下移"))
        } else {
            CommandResponse::err(format!("图层 {name} 不存在或已在底层"))
        }
    }
}

struct ClearLayersCommand;

impl CommandHandler for ClearLayersCommand {
    fn name(&self) -> &'static str {
        "clear_layers"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.controller.clear_all_layers();
        CommandResponse::ok("图层已清空")
    }
}

struct ListLayersCommand;

impl CommandHandler for ListLayersCommand {
    fn name(&self) -> &'static str {
        "list_layers"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let names = context.controller.document().display_names();
        if names.is_empty() {
            CommandResponse::ok("（无图层）")
        } else {
            CommandResponse::ok(names.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use shpview_core::geometry::DisplayRect;

    use super::*;
    use crate::controller::NullObserver;
    use crate::testing;

    fn controller() -> ViewportController {
        let mut controller = ViewportController::new(testing::factory(), Rc::new(NullObserver));
        controller.set_screen_rect(DisplayRect::from_origin_size(0, 0, 800, 600));
        controller.add_layers(["data/square.shp", "data/roads.shp", "data/wells.shp"]);
        controller
    }

    fn run(bus: &CommandBus, controller: &mut ViewportController, line: &str) -> CommandResponse {
        let request = CommandRequest::parse(line).expect("非空命令");
        let mut context = CommandContext { controller };
        bus.dispatch(&request, &mut context)
    }

    #[test]
    fn layer_commands_reorder_and_list() {
        let bus = CommandBus::new();
        let mut controller = controller();

        let response = run(&bus, &mut controller, "list_layers");
        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("wells, roads, square"));

        assert!(run(&bus, &mut controller, "raise_layer square").success);
        assert!(run(&bus, &mut controller, "lower_layer wells").success);
        let response = run(&bus, &mut controller, "list_layers");
        assert_eq!(response.message.as_deref(), Some("square, wells, roads"));

        assert!(run(&bus, &mut controller, "remove_layer roads").success);
        assert!(!run(&bus, &mut controller, "remove_layer roads").success);
        assert_eq!(controller.document().len(), 2);

        assert!(run(&bus, &mut controller, "clear_layers").success);
        assert!(controller.document().is_empty());
        assert!(!run(&bus, &mut controller, "zoom_all").success);
    }

    #[test]
    fn zoom_commands_drive_viewport() {
        let bus = CommandBus::new();
        let mut controller = controller();

        assert!(run(&bus, &mut controller, "zoom_all").success);
        assert!((controller.viewport().scale() - 14.4).abs() < 1e-9);

        assert!(run(&bus, &mut controller, "zoom_layer square").success);
        assert!((controller.viewport().scale() - 54.0).abs() < 1e-9);

        assert!(run(&bus, &mut controller, "zoom_in").success);
        assert!((controller.viewport().scale() - 54.0 * 1.125).abs() < 1e-9);
        assert!(run(&bus, &mut controller, "zoom_out").success);
        assert!((controller.viewport().scale() - 54.0 * 1.125 * 0.875).abs() < 1e-9);
    }

    #[test]
    fn unknown_commands_and_missing_arguments_fail() {
        let bus = CommandBus::new();
        let mut controller = controller();

        let response = run(&bus, &mut controller, "explode");
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("未知命令: explode"));

        for line in ["zoom_layer", "remove_layer", "raise_layer", "lower_layer"] {
            assert!(!run(&bus, &mut controller, line).success, "{line}");
        }
        assert!(!run(&bus, &mut controller, "zoom_layer lakes").success);
        assert_eq!(controller.document().len(), 3);
        assert!(CommandRequest::parse("   ").is_none());
    }

    #[test]
    fn available_commands_are_sorted() {
        let bus = CommandBus::new();
        assert_eq!(
            bus.available_commands(),
            vec![
                "clear_layers",
                "list_layers",
                "lower_layer",
                "raise_layer",
                "remove_layer",
                "zoom_all",
                "zoom_in",
                "zoom_layer",
                "zoom_out",
            ]
        );
    }

    #[test]
    fn multi_word_layer_names_are_joined() {
        let request = CommandRequest::new("zoom_layer")
            .with_arg("city")
            .with_arg("parcels");
        assert_eq!(request.layer_name().as_deref(), Some("city parcels"));
    }
}
