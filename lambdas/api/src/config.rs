use std::{env, time::Duration};

use anyhow::{bail, Context, Result};
use domain::{
    requests::AcceptPolicy,
    storage::{BucketNames, DEFAULT_SIGNED_URL_TTL},
};

/// API settings read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub buckets: BucketNames,
    pub signed_url_ttl: Duration,
    pub accept_policy: AcceptPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let supabase_url = env::var("SUPABASE_URL").context("SUPABASE_URL must be set")?;
        let supabase_anon_key =
            env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?;

        let signed_url_ttl = match env::var("SIGNED_URL_TTL_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.parse()
                    .with_context(|| format!("Invalid SIGNED_URL_TTL_SECS: {secs}"))?,
            ),
            Err(_) => DEFAULT_SIGNED_URL_TTL,
        };

        let accept_policy = match env::var("ACCEPT_POLICY") {
            Ok(code) => match AcceptPolicy::from_code(&code) {
                Some(policy) => policy,
                None => bail!("Invalid ACCEPT_POLICY: {code}"),
            },
            Err(_) => AcceptPolicy::default(),
        };

        tracing::info!(?accept_policy, ttl_secs = signed_url_ttl.as_secs(), "Configuration loaded");

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            buckets: BucketNames::from_env(),
            signed_url_ttl,
            accept_policy,
        })
    }
}
