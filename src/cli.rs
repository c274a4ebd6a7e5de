//! Command-line arguments and the interactive start/stop prompts.

use std::io::{self, BufRead, Write};

pub struct Args {
    /// Advertised address to fall back on when local discovery yields
    /// loopback
    pub fallback_ip: Option<String>,
    pub help: bool,
}

pub fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    parse_from(&args)
}

fn parse_from(args: &[String]) -> Args {
    let mut result = Args { fallback_ip: None, help: false };

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => result.help = true,
            other => {
                if result.fallback_ip.is_none() {
                    result.fallback_ip = Some(other.to_string());
                }
            }
        }
    }

    result
}

pub fn print_help() {
    println!("siprelay - SIP proxy / registrar over UDP\n");
    println!("USAGE:");
    println!("    siprelay [FALLBACK_IP]\n");
    println!("ARGS:");
    println!("    FALLBACK_IP    Address to advertise when the host only resolves to loopback\n");
    println!("OPTIONS:");
    println!("    --help, -h     Show this help message\n");
    println!("ENVIRONMENT:");
    println!("    SIP_PORT       UDP listening port (default 5060)");
    println!("    PROXY_LOG      Log file path (default proxy.log)");
    println!("    CALL_DIARY     Call diary path (default phoneCallDiary.txt)");
}

/// Ask until the operator answers Y (start) or N (exit). EOF counts as N
/// so a closed stdin cannot spin the prompt.
pub fn confirm_start() -> io::Result<bool> {
    prompt_loop(
        "Press Y if you want to start SIP proxy or N if you want to stop the execution. ",
        &["Y", "N"],
    )
    .map(|answer| answer.as_deref() == Some("Y"))
}

/// Block until the operator answers Y (stop). EOF also stops.
pub fn wait_for_stop() -> io::Result<()> {
    prompt_loop("Press Y if you want to stop SIP proxy. ", &["Y"]).map(|_| ())
}

fn prompt_loop(prompt: &str, accepted: &[&str]) -> io::Result<Option<String>> {
    let stdin = io::stdin();
    loop {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None); // EOF
        }
        let answer = line.trim().to_uppercase();
        if accepted.contains(&answer.as_str()) {
            return Ok(Some(answer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        std::iter::once("siprelay")
            .chain(raw.iter().copied())
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_parse_args_default() {
        let result = parse_from(&args(&[]));
        assert!(result.fallback_ip.is_none());
        assert!(!result.help);
    }

    #[test]
    fn test_parse_args_fallback_ip() {
        let result = parse_from(&args(&["192.0.2.7"]));
        assert_eq!(result.fallback_ip, Some("192.0.2.7".to_string()));
    }

    #[test]
    fn test_parse_args_help() {
        assert!(parse_from(&args(&["--help"])).help);
        assert!(parse_from(&args(&["-h"])).help);
    }

    #[test]
    fn test_parse_args_first_positional_wins() {
        let result = parse_from(&args(&["192.0.2.7", "198.51.100.9"]));
        assert_eq!(result.fallback_ip, Some("192.0.2.7".to_string()));
    }
}
