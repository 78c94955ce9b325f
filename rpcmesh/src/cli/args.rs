//! CLI argument definitions: all clap derive structs for `rpcmesh`
//! command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// A JSON-RPC 2.0 over HTTP framework: server, client, and service
/// description tooling.
#[derive(Parser, Debug)]
#[command(name = "rpcmesh", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "RPCMESH_COLOR")]
    pub color: ColorChoice,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the demo callable tree over HTTP (JSON-RPC + JSON-WSP description).
    Serve(ServeArgs),

    /// Print the JSON-WSP service description for the demo callable tree.
    Describe(DescribeArgs),

    /// Issue a single JSON-RPC call against a running `rpcmesh serve` instance.
    Call(CallArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// serve
// ============================================================================

/// Arguments for `serve`.
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Path to a YAML configuration file. When absent, a built-in default
    /// configuration binding `127.0.0.1:8080` is used.
    #[arg(short, long, env = "RPCMESH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the config file's (or default's) bind address.
    #[arg(long)]
    pub bind: Option<String>,
}

// ============================================================================
// describe
// ============================================================================

/// Arguments for `describe`.
#[derive(clap::Args, Debug)]
pub struct DescribeArgs {
    /// `servicename` to embed in the description document.
    #[arg(long, default_value = "rpcmesh-demo")]
    pub servicename: String,

    /// `url` to embed in the description document.
    #[arg(long, default_value = "http://127.0.0.1:8080/")]
    pub url: String,
}

// ============================================================================
// call
// ============================================================================

/// Arguments for `call`.
#[derive(clap::Args, Debug)]
pub struct CallArgs {
    /// Address of a running `rpcmesh serve` instance, e.g. `127.0.0.1:8080`.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,

    /// Dotted method path, e.g. `math.sum`.
    pub method: String,

    /// JSON array of positional arguments, e.g. `[1, 2]`.
    #[arg(default_value = "[]")]
    pub params: String,
}

// ============================================================================
// completions
// ============================================================================

/// Shell to generate a completion script for.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Arguments for `completions`.
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate a completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

// ============================================================================
// version
// ============================================================================

/// Output format shared by a few commands that can render as JSON.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Arguments for `version`.
#[derive(clap::Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Shared
// ============================================================================

/// Color output control, shared by every subcommand via the global flag.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_verifies_its_own_clap_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_with_no_arguments() {
        let cli = Cli::parse_from(["rpcmesh", "serve"]);
        match cli.command {
            Commands::Serve(args) => {
                assert!(args.config.is_none());
                assert!(args.bind.is_none());
            }
            other => panic!("expected Serve, got {other:?}"),
        }
    }

    #[test]
    fn parses_call_with_default_params() {
        let cli = Cli::parse_from(["rpcmesh", "call", "math.sum"]);
        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.method, "math.sum");
                assert_eq!(args.params, "[]");
                assert_eq!(args.addr, "127.0.0.1:8080");
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parses_call_with_explicit_params_and_addr() {
        let cli = Cli::parse_from([
            "rpcmesh",
            "call",
            "--addr",
            "localhost:9090",
            "math.sum",
            "[1, 2]",
        ]);
        match cli.command {
            Commands::Call(args) => {
                assert_eq!(args.addr, "localhost:9090");
                assert_eq!(args.params, "[1, 2]");
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn verbose_counts_repeated_flags() {
        let cli = Cli::parse_from(["rpcmesh", "-vvv", "version"]);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn color_defaults_to_auto() {
        let cli = Cli::parse_from(["rpcmesh", "version"]);
        assert_eq!(cli.color, ColorChoice::Auto);
    }

    #[test]
    fn completions_requires_a_shell() {
        let result = Cli::try_parse_from(["rpcmesh", "completions"]);
        assert!(result.is_err());
    }

    #[test]
    fn version_format_defaults_to_human() {
        let cli = Cli::parse_from(["rpcmesh", "version"]);
        match cli.command {
            Commands::Version(args) => assert_eq!(args.format, OutputFormat::Human),
            other => panic!("expected Version, got {other:?}"),
        }
    }
}
