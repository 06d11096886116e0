pub mod alias_oracle;
pub mod annotator;
pub mod mem2reg;
