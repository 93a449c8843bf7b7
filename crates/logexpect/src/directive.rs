//! The declarative directive surface.
//!
//! A directive is a pre-tokenized argument vector in the form
//!
//! ```text
//! NAME [-v <id>] [-g <grouping>] [-d 0|1] [-q <query>]
//!      [-b|-c] [-i <taglist>] [-C] [<spec-block>] [-start|-run|-wait]
//! ```
//!
//! applied against a [`Registry`]. The named engine is created on first
//! reference. Arguments apply in order and any argument other than
//! `-wait` implicitly waits for a run already in flight, so a directive
//! can never reconfigure an engine under a live dispatch loop.

use logtap::{Direction, Grouping, Side, Tag};

use crate::error::{ExpectError, Result};
use crate::registry::Registry;

/// Apply one directive to `registry`. `argv[0]` names the engine.
///
/// Processing stops at the first failing argument.
pub async fn apply(registry: &mut Registry, argv: &[&str]) -> Result<()> {
    let Some((&name, args)) = argv.split_first() else {
        return Err(ExpectError::syntax("missing logexpect name"));
    };
    let slot = registry.engine_slot(name);

    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "-wait" => {
                if !registry.engine_mut(slot).is_running() {
                    return Err(ExpectError::config(format!(
                        "logexpect '{name}' not -started"
                    )));
                }
                registry.engine_mut(slot).wait().await?;
            }
            "-v" => {
                let id = flag_value(args, &mut i, "-v")?;
                let source = registry
                    .source(id)
                    .ok_or_else(|| ExpectError::config(format!("unknown log source '{id}'")))?;
                registry.engine_mut(slot).set_source(source).await?;
            }
            "-g" => {
                let raw = flag_value(args, &mut i, "-g")?;
                let grouping = Grouping::from_name(raw)
                    .ok_or_else(|| ExpectError::config(format!("unknown grouping '{raw}'")))?;
                registry.engine_mut(slot).set_grouping(grouping).await?;
            }
            "-d" => {
                let raw = flag_value(args, &mut i, "-d")?;
                let from_start: i64 = raw
                    .parse()
                    .map_err(|_| ExpectError::syntax(format!("not an integer: '{raw}'")))?;
                let direction = if from_start == 0 {
                    Direction::Tail
                } else {
                    Direction::FromStart
                };
                registry.engine_mut(slot).set_direction(direction).await?;
            }
            "-q" => {
                let query = flag_value(args, &mut i, "-q")?;
                registry.engine_mut(slot).set_query(query).await?;
            }
            "-b" => registry.engine_mut(slot).set_side(Side::Backend).await?,
            "-c" => registry.engine_mut(slot).set_side(Side::Client).await?,
            "-i" => {
                let raw = flag_value(args, &mut i, "-i")?;
                let tags = parse_taglist(raw)?;
                registry.engine_mut(slot).include_tags(tags).await?;
            }
            "-C" => registry.engine_mut(slot).set_caseless(true).await?,
            "-start" => registry.engine_mut(slot).start().await?,
            "-run" => registry.engine_mut(slot).run().await?,
            flag if flag.starts_with('-') => {
                return Err(ExpectError::config(format!(
                    "unknown logexpect argument: {flag}"
                )));
            }
            block => registry.engine_mut(slot).spec(block).await?,
        }
        i += 1;
    }
    Ok(())
}

impl Registry {
    /// Apply one directive; see [`apply`].
    pub async fn apply(&mut self, argv: &[&str]) -> Result<()> {
        apply(self, argv).await
    }
}

fn flag_value<'a>(args: &[&'a str], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .copied()
        .ok_or_else(|| ExpectError::syntax(format!("missing {flag} argument")))
}

fn parse_taglist(raw: &str) -> Result<Vec<Tag>> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| Tag::from_name(name).ok_or_else(|| ExpectError::unknown_tag(name)))
        .collect()
}
