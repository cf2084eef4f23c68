// Shared prompt constants used directly by the LLM client.
// Report-specific prompts live in evaluation::prompts.

/// Instruction sent alongside every image in a vision call.
pub const VISION_INSTRUCTION: &str = "请详细描述这张图片中的所有文字和内容，包括任何文档、图表、脑图、流程图等。\
    如果是产品设计图或需求文档，请提取所有功能点和需求描述。";
