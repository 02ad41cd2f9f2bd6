pub mod r#trait;

pub use r#trait::{
    GenerationCapability, GenerationRequest, GenerationResponse, OutputSchema, ToolCall,
    ToolResult, ToolRound, ToolSpec,
};
