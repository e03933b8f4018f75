// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operation scripts for `chanctl exec`.
//!
//! Grammar, one op per argument:
//!   write:<text> | write@<off>:<text> | read:<n> | seek:<set|cur|end>:<n>
//!   reset | get:<field> | set:<field>:<n> | notify:<on|off> | poll | stats

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use chardev_chan::{Channel, ControlOp, Field, PollEvents, Session, Whence};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Write(Vec<u8>),
    WriteAt(usize, Vec<u8>),
    Read(usize),
    Seek(Whence, i64),
    Reset,
    Get(Field),
    Set(Field, u64),
    Notify(bool),
    Poll,
    Stats,
}

impl FromStr for Op {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (head, rest) = match s.split_once(':') {
            Some((head, rest)) => (head, Some(rest)),
            None => (s, None),
        };
        let arg = || rest.ok_or_else(|| anyhow!("`{head}` needs an argument"));
        let op = match head {
            "write" => Op::Write(arg()?.as_bytes().to_vec()),
            "read" => Op::Read(arg()?.parse().context("read length")?),
            "seek" => {
                let (whence, offset) =
                    arg()?.split_once(':').ok_or_else(|| anyhow!("expected seek:<whence>:<n>"))?;
                let whence = match whence {
                    "set" => Whence::Set,
                    "cur" => Whence::Cur,
                    "end" => Whence::End,
                    other => bail!("unknown whence `{other}`"),
                };
                Op::Seek(whence, offset.parse().context("seek offset")?)
            }
            "reset" => Op::Reset,
            "get" => Op::Get(parse_field(arg()?)?),
            "set" => {
                let (field, value) =
                    arg()?.split_once(':').ok_or_else(|| anyhow!("expected set:<field>:<n>"))?;
                Op::Set(parse_field(field)?, value.parse().context("set value")?)
            }
            "notify" => match arg()? {
                "on" => Op::Notify(true),
                "off" => Op::Notify(false),
                other => bail!("notify takes on|off, got `{other}`"),
            },
            "poll" => Op::Poll,
            "stats" => Op::Stats,
            other => match other.strip_prefix("write@") {
                Some(offset) => {
                    Op::WriteAt(offset.parse().context("write offset")?, arg()?.as_bytes().to_vec())
                }
                None => bail!("unknown op `{other}`"),
            },
        };
        Ok(op)
    }
}

fn parse_field(name: &str) -> anyhow::Result<Field> {
    name.parse().map_err(|_| anyhow!("unknown field `{name}`"))
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Write(data) => write!(f, "write {}B", data.len()),
            Op::WriteAt(offset, data) => write!(f, "write@{offset} {}B", data.len()),
            Op::Read(n) => write!(f, "read {n}"),
            Op::Seek(whence, offset) => write!(f, "seek {whence:?} {offset}"),
            Op::Reset => f.write_str("reset"),
            Op::Get(field) => write!(f, "get {field}"),
            Op::Set(field, value) => write!(f, "set {field}={value}"),
            Op::Notify(on) => write!(f, "notify {}", if *on { "on" } else { "off" }),
            Op::Poll => f.write_str("poll"),
            Op::Stats => f.write_str("stats"),
        }
    }
}

pub fn parse_script<S: AsRef<str>>(ops: &[S]) -> anyhow::Result<Vec<Op>> {
    ops.iter()
        .map(|op| op.as_ref().parse().with_context(|| format!("parsing `{}`", op.as_ref())))
        .collect()
}

fn describe_events(events: PollEvents) -> String {
    let mut parts = Vec::new();
    if events.contains(PollEvents::READABLE) {
        parts.push("readable");
    }
    if events.contains(PollEvents::WRITABLE) {
        parts.push("writable");
    }
    if parts.is_empty() {
        "none".to_owned()
    } else {
        parts.join("|")
    }
}

fn apply(channel: &Channel, session: &mut Session, op: &Op) -> chardev_chan::Result<String> {
    Ok(match op {
        Op::Write(data) => format!("{} bytes", session.write(data)?),
        Op::WriteAt(offset, data) => format!("{} bytes", session.write_at(*offset, data)?),
        Op::Read(n) => format!("{:?}", String::from_utf8_lossy(&session.read(*n)?)),
        Op::Seek(whence, offset) => format!("position {}", session.seek(*offset, *whence)?),
        Op::Reset => {
            session.control(ControlOp::Reset)?;
            "ok".to_owned()
        }
        Op::Get(field) => session.control(ControlOp::Get(*field))?.to_string(),
        Op::Set(field, value) => {
            session.control(ControlOp::Set(*field, *value))?;
            "ok".to_owned()
        }
        Op::Notify(on) => {
            let op = if *on { ControlOp::EnableNotify } else { ControlOp::DisableNotify };
            session.control(op)?;
            "ok".to_owned()
        }
        Op::Poll => describe_events(session.poll()?),
        Op::Stats => format!("{:?}", channel.stats()?),
    })
}

/// Runs `ops` on one session; per-op failures are reported and skipped.
///
/// Returns the number of ops that failed.
pub fn execute(channel: &Channel, ops: &[Op], out: &mut impl Write) -> anyhow::Result<usize> {
    let mut session = channel.open().context("opening session")?;
    let mut failures = 0;
    for op in ops {
        match apply(channel, &mut session, op) {
            Ok(result) => writeln!(out, "{op}: {result}")?,
            Err(err) => {
                failures += 1;
                log::debug!("op {op} failed with errno {}", err.errno());
                writeln!(out, "{op}: error: {err}")?;
            }
        }
    }
    session.close();
    Ok(failures)
}
