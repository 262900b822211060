#[derive(pest_derive::Parser)]
#[grammar = "unicode_data.pest"]
pub struct Grammar;
