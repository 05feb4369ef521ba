pub mod mask;
pub mod scanner;
