use anyhow::Result;
use serde_json::Value;

use super::Context;
use crate::render;

/// Discover the account and list its calendars.
pub fn run(ctx: &Context) -> Result<Value> {
    let client = ctx.connect()?;
    render::to_value(&client.doctor()?)
}
