//! We can have a little hard-coded config, [as a
//! snack](https://knowyourmeme.com/memes/cats-can-have-a-little-salami).
//! Everything that differs between deployments comes from the environment
//! (or a `.env` file, via dotenvy).

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use std::{env, net::SocketAddr};

/// Notes per page on the front page.
pub const PAGE_SIZE: i64 = 5;

/// Job executions older than this are pruned by the weekly cleanup job.
pub const DEFAULT_CLEANUP_MAX_AGE_SECS: u64 = 604_800;

/// A century. Anything longer cannot be subtracted from "now" anyway.
pub const MAX_CLEANUP_MAX_AGE_SECS: u64 = 100 * 365 * 86_400;

/// Logging in is the authentication service's job; we just send people
/// there.
pub const LOGIN_URL: &str = "/accounts/login";

/// Postgres default max connections is 100, and we'll take most of 'em
/// https://www.postgresql.org/docs/current/runtime-config-connection.html
pub const MAX_CONNECTIONS: u32 = 80;

#[derive(Clone, Debug)]
pub struct Config {
    pub db_url: String,
    pub listen_addr: SocketAddr,
    pub session_secret: Vec<u8>,
    pub time_zone: FixedOffset,
    pub cleanup_max_age_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let pg_usr = required("POSTGRES_USER")?;
        let pg_pw = required("POSTGRES_PASSWORD")?;
        let pg_db = required("POSTGRES_DB")?;
        let pg_host =
            env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".into());
        let pg_port =
            env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".into());
        let db_url =
            format!("postgres://{pg_usr}:{pg_pw}@{pg_host}:{pg_port}/{pg_db}");

        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".into())
            .parse()
            .context("LISTEN_ADDR is not a socket address")?;
        let time_zone = parse_utc_offset(
            &env::var("TIME_ZONE").unwrap_or_else(|_| "+00:00".into()),
        )?;
        let cleanup_max_age_secs = match env::var("CLEANUP_MAX_AGE_SECS") {
            Ok(v) => parse_cleanup_max_age(&v)?,
            Err(_) => DEFAULT_CLEANUP_MAX_AGE_SECS,
        };

        Ok(Self {
            db_url,
            listen_addr,
            session_secret: required("SESSION_SECRET")?.into(),
            time_zone,
            cleanup_max_age_secs,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} to be defined in environment"))
}

pub fn parse_cleanup_max_age(raw: &str) -> Result<u64> {
    let secs: u64 = raw
        .trim()
        .parse()
        .context("CLEANUP_MAX_AGE_SECS is not a number of seconds")?;
    if secs > MAX_CLEANUP_MAX_AGE_SECS {
        bail!("CLEANUP_MAX_AGE_SECS may be at most {MAX_CLEANUP_MAX_AGE_SECS}");
    }

    Ok(secs)
}

/// Parse `+HH:MM` / `-HH:MM` (or `Z`) into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw == "Z" || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).context("zero offset");
    }
    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        bail!("time zone {raw:?} must look like +HH:MM");
    };
    let Some((hours, minutes)) = rest.split_once(':') else {
        bail!("time zone {raw:?} must look like +HH:MM");
    };
    let hours: i32 = hours.parse().context("bad hour in time zone")?;
    let minutes: i32 = minutes.parse().context("bad minute in time zone")?;
    if hours > 23 || minutes > 59 {
        bail!("time zone {raw:?} is out of range");
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("time zone {raw:?} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(
            parse_utc_offset("+03:00").unwrap().local_minus_utc(),
            3 * 3600
        );
        assert_eq!(
            parse_utc_offset("-05:30").unwrap().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_utc_offset_rejects_garbage() {
        assert!(parse_utc_offset("Europe/Moscow").is_err());
        assert!(parse_utc_offset("+3").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
    }

    #[test]
    fn test_parse_cleanup_max_age() {
        assert_eq!(parse_cleanup_max_age("604800").unwrap(), 604_800);
        assert_eq!(parse_cleanup_max_age(" 0 ").unwrap(), 0);
        assert!(parse_cleanup_max_age("a week").is_err());
        assert!(parse_cleanup_max_age("-1").is_err());
        assert!(parse_cleanup_max_age("10000000000000").is_err());
        assert!(parse_cleanup_max_age(&MAX_CLEANUP_MAX_AGE_SECS.to_string()).is_ok());
    }
}
