pub mod execute;
pub mod pipeline;
