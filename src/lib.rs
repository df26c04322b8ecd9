pub mod ast;
pub mod compiler;
pub mod diagnostic;
pub mod listing;
pub mod parser;
pub mod semantic;
pub mod symbol_table;
pub mod tokenizer;
