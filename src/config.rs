use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public endpoint of the GES DISC subsetting service.
pub const DEFAULT_URL: &str = "https://disc.gsfc.nasa.gov/service/subset/jsonwsp";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// JSON-WSP endpoint of the subset service.
    pub url: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Per-request HTTP timeout. Large artifacts may need more than the default.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            verify: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RcConfig {
    url: Option<String>,
    verify: Option<bool>,
    timeout: Option<Duration>,
}

/// Resolves the configuration, in order of precedence:
/// - explicit arguments
/// - environment variables `GESDISC_SUBSET_URL` / `GESDISC_VERIFY`
/// - config file from `GESDISC_RC`, `./.gesdiscrc` or `~/.gesdiscrc`
/// - built-in defaults
pub(crate) fn load_config(url: Option<String>, verify: Option<bool>) -> Result<ClientConfig> {
    layered(url, verify, |key| std::env::var(key).ok(), &rc_candidates())
}

fn layered(
    url: Option<String>,
    verify: Option<bool>,
    env: impl Fn(&str) -> Option<String>,
    rc_paths: &[PathBuf],
) -> Result<ClientConfig> {
    let env_url = env("GESDISC_SUBSET_URL").filter(|v| !v.trim().is_empty());
    let env_verify = env("GESDISC_VERIFY").map(|v| parse_verify(&v));
    resolve(url.or(env_url), verify.or(env_verify), rc_paths)
}

fn resolve(url: Option<String>, verify: Option<bool>, rc_paths: &[PathBuf]) -> Result<ClientConfig> {
    let mut rc = RcConfig::default();
    if let Some(rc_path) = rc_paths.iter().find(|p| p.exists()) {
        rc = read_rc(rc_path)
            .with_context(|| format!("failed to read configuration file {}", rc_path.display()))?;
        log::debug!("loaded configuration from {}", rc_path.display());
    }

    let url = url
        .or(rc.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let verify = verify.or(rc.verify).unwrap_or(true);

    Ok(ClientConfig {
        url,
        verify,
        timeout: rc.timeout.unwrap_or(DEFAULT_TIMEOUT),
    })
}

fn parse_verify(v: &str) -> bool {
    !matches!(v.trim(), "0" | "false" | "no")
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // Support formatting where `url:` is on one line and the value is on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            // Continuation value line. URLs carry a colon, so only a known key ends it.
            if !starts_with_key(line) {
                cfg.set(pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':').filter(|_| starts_with_key(line)) {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                cfg.set(k, v);
            }
        }
    }

    cfg
}

fn starts_with_key(line: &str) -> bool {
    line.split_once(':')
        .map(|(k, _)| matches!(k.trim(), "url" | "verify" | "timeout"))
        .unwrap_or(false)
}

impl RcConfig {
    fn set(&mut self, key: &str, value: &str) {
        match key {
            "url" => self.url = Some(value.to_string()),
            "verify" => self.verify = Some(parse_verify(value)),
            "timeout" => match value.parse::<u64>() {
                Ok(secs) => self.timeout = Some(Duration::from_secs(secs)),
                Err(_) => log::warn!("ignoring non-numeric timeout `{value}`"),
            },
            _ => {}
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) GESDISC_RC (explicit)
    // 2) ./.gesdiscrc
    // 3) ~/.gesdiscrc
    if let Ok(p) = std::env::var("GESDISC_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".gesdiscrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".gesdiscrc"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inline_and_continued_values() {
        let cfg = parse_rc(
            "# GES DISC\nurl:\n  'https://example.org/service/subset/jsonwsp'\nverify: 0\n",
        );
        assert_eq!(
            cfg,
            RcConfig {
                url: Some("https://example.org/service/subset/jsonwsp".into()),
                verify: Some(false),
                timeout: None,
            }
        );

        let cfg = parse_rc("url: \"https://a.example/jsonwsp\"\nunknown: x\n");
        assert_eq!(cfg.url.as_deref(), Some("https://a.example/jsonwsp"));
        assert_eq!(cfg.verify, None);
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let cfg = resolve(None, None, &[]).unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn explicit_values_win_over_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".gesdiscrc");
        std::fs::write(&rc, "url: https://rc.example/jsonwsp\nverify: 0\n").unwrap();

        let from_rc = resolve(None, None, &[rc.clone()]).unwrap();
        assert_eq!(from_rc.url, "https://rc.example/jsonwsp");
        assert!(!from_rc.verify);

        let explicit = resolve(Some("https://arg.example/jsonwsp".into()), None, &[rc]).unwrap();
        assert_eq!(explicit.url, "https://arg.example/jsonwsp");
        assert!(!explicit.verify);
    }

    #[test]
    fn environment_sits_between_arguments_and_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".gesdiscrc");
        std::fs::write(&rc, "url: https://rc.example/jsonwsp\nverify: 1\ntimeout: 90\n").unwrap();
        let env = |key: &str| match key {
            "GESDISC_SUBSET_URL" => Some("https://env.example/jsonwsp".to_string()),
            "GESDISC_VERIFY" => Some("0".to_string()),
            _ => None,
        };

        let cfg = layered(None, None, env, &[rc.clone()]).unwrap();
        assert_eq!(cfg.url, "https://env.example/jsonwsp");
        assert!(!cfg.verify);
        assert_eq!(cfg.timeout, Duration::from_secs(90));

        let cfg = layered(Some("https://arg.example/jsonwsp".into()), Some(true), env, &[rc.clone()])
            .unwrap();
        assert_eq!(cfg.url, "https://arg.example/jsonwsp");
        assert!(cfg.verify);

        let cfg = layered(None, None, |_| Some(" ".to_string()), &[rc]).unwrap();
        assert_eq!(cfg.url, "https://rc.example/jsonwsp");
    }

    #[test]
    fn first_existing_candidate_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let rc = dir.path().join("rc");
        std::fs::write(&rc, "verify: 1\ntimeout: 600\n").unwrap();

        let cfg = resolve(None, None, &[missing, rc]).unwrap();
        assert!(cfg.verify);
        assert_eq!(cfg.timeout, Duration::from_secs(600));
        assert_eq!(cfg.url, DEFAULT_URL);
    }
}
