use clap::Parser;

/// Profiling endpoints for a live process
#[derive(Parser, Debug)]
#[command(version, name = "pprof-http-ws", about = "Serves runtime profiles over HTTP", long_about = None)]
pub struct Args {
    /// Server port
    #[arg(short, long, env = "PORT", default_value = "6060")]
    pub port: u16,
    /// Path prefix of the diagnostic endpoints
    #[arg(long, env = "PPROF_PREFIX", default_value = "/debug/pprof/")]
    pub prefix: String,
    /// CPU sampling frequency in Hz
    #[arg(long, env = "CPU_FREQUENCY", default_value = "100")]
    pub cpu_frequency: i32,
    /// Run a background busy loop so captures have something to show
    #[arg(long, env = "WORKLOAD")]
    pub workload: bool,
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub prefix: String,
    pub cpu_frequency: i32,
    pub workload: bool,
    pub version: String,
}

impl Config {
    pub fn build(args: Args) -> Result<Config, String> {
        let prefix = args.prefix.trim().to_string();
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(format!("prefix must start and end with `/`: `{prefix}`"));
        }
        if args.cpu_frequency <= 0 {
            return Err(format!("wrong cpu frequency: {}", args.cpu_frequency));
        }
        Ok(Config {
            port: args.port,
            prefix,
            cpu_frequency: args.cpu_frequency,
            workload: args.workload,
            version: option_env!("CARGO_APP_VERSION").unwrap_or("dev").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(args: &[&str]) -> Result<Config, String> {
        let mut all = vec!["pprof-http-ws"];
        all.extend_from_slice(args);
        let args = Args::try_parse_from(all).map_err(|e| e.to_string())?;
        Config::build(args)
    }

    #[test]
    fn test_defaults() {
        let cfg = build(&[]).unwrap();
        assert_eq!(cfg.prefix, "/debug/pprof/");
        assert_eq!(cfg.cpu_frequency, 100);
        assert_eq!(cfg.workload, false);
    }

    #[test]
    fn test_build() {
        let cfg = build(&["--port", "7000", "--prefix", "/diag/", "--workload"]).unwrap();
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.prefix, "/diag/");
        assert!(cfg.workload);
    }

    #[test]
    fn test_wrong() {
        assert!(build(&["--prefix", "/diag"]).is_err());
        assert!(build(&["--prefix", "diag/"]).is_err());
        assert!(build(&["--cpu-frequency", "0"]).is_err());
        assert!(build(&["--port", "x"]).is_err());
    }
}
