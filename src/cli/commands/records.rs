//! record commands - find, index, create, update, sync, delete

use anyhow::{bail, Context as _, Result};
use serde_json::{Map, Value};

use super::Context;
use crate::cli::args::Command;
use crate::cli::output;
use crate::model::{Model, ModelClass};

/// Run a record command.
pub async fn run(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Find { model, id } => find(ctx, &model, &id).await,
        Command::Index { model } => index(ctx, &model).await,
        Command::Create { model, set } => create(ctx, &model, &set).await,
        Command::Update { model, id, set } => update(ctx, &model, &id, &set).await,
        Command::Sync {
            model,
            id,
            key,
            value,
        } => sync(ctx, &model, &id, &key, value.as_deref()).await,
        Command::Delete { model, id } => delete(ctx, &model, &id).await,
        Command::Config | Command::Completion { .. } => {
            bail!("not a record command")
        }
    }
}

async fn find(ctx: &Context, model: &str, id: &str) -> Result<()> {
    if ctx.offline {
        bail!("find needs the backend; drop --offline");
    }
    let class = ctx.model(model)?;

    match class.find(parse_id(id)).await? {
        Some(record) => {
            output::json(&record.to_object());
            Ok(())
        }
        None => bail!("no {} with key {}", class.name(), id),
    }
}

async fn index(ctx: &Context, model: &str) -> Result<()> {
    if ctx.offline {
        bail!("index needs the backend; drop --offline");
    }
    let class = ctx.model(model)?;

    let records = class.all().await?;
    output::debug(
        format!("{} {} record(s)", records.count(), class.name()),
        ctx.verbosity,
    );
    output::json(&records.to_value());
    Ok(())
}

async fn create(ctx: &Context, model: &str, assignments: &[String]) -> Result<()> {
    let class = ctx.model(model)?;
    let data = parse_assignments(assignments)?;

    let record = class.make(&Value::Object(data));
    let record = if ctx.offline {
        record.clone_offline()
    } else {
        record
    };

    let saved = record.save().await?;
    output::status(format!("created {}", describe(&saved)), ctx.verbosity);
    output::json(&saved.to_object());
    Ok(())
}

async fn update(ctx: &Context, model: &str, id: &str, assignments: &[String]) -> Result<()> {
    let class = ctx.model(model)?;
    let mut patch = parse_assignments(assignments)?;
    if patch.is_empty() {
        bail!("nothing to update; pass at least one --set FIELD=VALUE");
    }

    let record = if ctx.offline {
        // The offline echo stands in for the response.
        patch
            .entry(class.schema().key().to_string())
            .or_insert_with(|| parse_id(id));
        keyed(class, id).clone_offline()
    } else {
        match class.find(parse_id(id)).await? {
            Some(record) => record,
            None => bail!("no {} with key {}", class.name(), id),
        }
    };

    let updated = record.update(patch).await?;
    output::status(format!("updated {}", describe(&updated)), ctx.verbosity);
    output::json(&updated.to_object());
    Ok(())
}

async fn sync(
    ctx: &Context,
    model: &str,
    id: &str,
    key: &str,
    value: Option<&str>,
) -> Result<()> {
    let class = ctx.model(model)?;
    let mut record = keyed(class, id);
    if ctx.offline {
        record = record.clone_offline();
    }

    let response = record.sync(key, value.map(parse_value), None).await?;
    output::json(&response);
    Ok(())
}

async fn delete(ctx: &Context, model: &str, id: &str) -> Result<()> {
    let class = ctx.model(model)?;
    let mut record = keyed(class, id);
    if ctx.offline {
        record = record.clone_offline();
    }

    let deleted = record.delete().await?;
    output::status(format!("deleted {}", describe(&deleted)), ctx.verbosity);
    Ok(())
}

/// An instance carrying only its primary key.
fn keyed(class: &ModelClass, id: &str) -> Model {
    let mut data = Map::new();
    data.insert(class.schema().key().to_string(), parse_id(id));
    class.make(&Value::Object(data))
}

fn describe(record: &Model) -> String {
    match record.key() {
        Value::Null => record.class().name().to_string(),
        key => format!("{} {}", record.class().name(), key),
    }
}

/// Parse a command-line key: integers stay numbers, anything else is a
/// string.
pub fn parse_id(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parse a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parse `FIELD=VALUE` assignments into an object.
///
/// # Errors
///
/// Fails on an assignment without `=` or with an empty field name.
pub fn parse_assignments(assignments: &[String]) -> Result<Map<String, Value>> {
    let mut data = Map::new();
    for assignment in assignments {
        let (field, raw) = assignment
            .split_once('=')
            .with_context(|| format!("expected FIELD=VALUE, got '{}'", assignment))?;
        let field = field.trim();
        if field.is_empty() {
            bail!("empty field name in '{}'", assignment);
        }
        data.insert(field.to_string(), parse_value(raw));
    }
    Ok(data)
}
