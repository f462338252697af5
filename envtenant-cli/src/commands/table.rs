//! Table command - print a table name with the active prefix.

use async_trait::async_trait;
use envtenant_core::{BoxError, ResolutionContext, UnitOfWork};

pub struct Table {
    pub name: String,
}

#[async_trait]
impl UnitOfWork for Table {
    async fn run(&self, ctx: &ResolutionContext) -> Result<i32, BoxError> {
        if self.name.trim().is_empty() {
            return Err("table name must not be empty".into());
        }
        println!("{}", ctx.table(&self.name));
        Ok(0)
    }
}
