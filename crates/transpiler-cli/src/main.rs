use std::{
    fs,
    io::{self, Read},
};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgGroup, Command};
use tracing::debug;
use transpiler_core::{
    init_tracing,
    rewrite::{c_rules, CapturePolicy, MatchMode},
    PrinterConfig, Transpiler, TranspilerConfig,
};

fn cli() -> Command {
    Command::new("transpile")
        .version(transpiler_core::VERSION)
        .about("Lower a single Python-like function to C-like source")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Source file, or - for standard input")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("return-type")
                .long("return-type")
                .value_name("TYPE")
                .help("Declared return type")
                .default_value("double"),
        )
        .arg(
            Arg::new("param-type")
                .long("param-type")
                .value_name("NAME=TYPE")
                .help("Declared type of one parameter (repeatable)")
                .value_parser(parse_param_type)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("default-type")
                .long("default-type")
                .value_name("TYPE")
                .help("Type for parameters without --param-type"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Rewrite every node bottom-up, or only the root")
                .value_parser(["bottom-up", "top-level"])
                .default_value("bottom-up"),
        )
        .arg(
            Arg::new("indent")
                .long("indent")
                .value_name("WIDTH")
                .help("Spaces per indentation level in the output")
                .value_parser(clap::value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            Arg::new("overwrite-captures")
                .long("overwrite-captures")
                .help("Let a repeated capture take the last value instead of requiring equal values")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .help("Show what every rule would do at every node instead of rewriting")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .help("Print the parsed tree instead of rewriting")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("source")
                .long("source")
                .help("Print the parsed function back as source instead of rewriting")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the tree as JSON")
                .requires("tree")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("output")
                .args(["trace", "tree", "source"])
                .multiple(false),
        )
}

fn parse_param_type(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, ty)) if !name.trim().is_empty() && !ty.trim().is_empty() => {
            Ok((name.trim().to_string(), ty.trim().to_string()))
        }
        _ => Err(format!("expected NAME=TYPE, got `{arg}`")),
    }
}

fn read_source(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read standard input")?;
        Ok(text)
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    init_tracing(matches.get_flag("debug"));

    let path = matches
        .get_one::<String>("file")
        .context("missing input file")?;
    let mode: MatchMode = matches
        .get_one::<String>("mode")
        .map_or(Ok(MatchMode::default()), |mode| mode.parse())?;
    let indent = matches.get_one::<usize>("indent").copied().unwrap_or(4);
    let capture_policy = if matches.get_flag("overwrite-captures") {
        CapturePolicy::Overwrite
    } else {
        CapturePolicy::Strict
    };

    let config = TranspilerConfig {
        mode,
        capture_policy,
        printer: PrinterConfig {
            indent: " ".repeat(indent),
        },
    };

    let source = read_source(path)?;
    let transpiler = Transpiler::parse(&source, c_rules::rules()?)
        .with_context(|| format!("cannot transpile {path}"))?
        .with_config(config);

    if matches.get_flag("tree") {
        if matches.get_flag("json") {
            println!("{}", serde_json::to_string_pretty(transpiler.ast())?);
        } else {
            println!("{}", transpiler.tree());
        }
        return Ok(());
    }
    if matches.get_flag("source") {
        println!("{}", transpiler.source()?);
        return Ok(());
    }

    let rettype = matches
        .get_one::<String>("return-type")
        .map_or("double", String::as_str);
    let declared: Vec<(String, String)> = matches
        .get_many::<(String, String)>("param-type")
        .map(|pairs| pairs.cloned().collect())
        .unwrap_or_default();

    let params = transpiler.parameter_names();
    for (name, _) in &declared {
        if !params.contains(&name.as_str()) {
            bail!("--param-type names `{name}`, which is not a parameter of the function");
        }
    }

    let mut vars = c_rules::variables(rettype, declared);
    if let Some(default) = matches.get_one::<String>("default-type") {
        vars.insert("default_type", default.as_str());
    }
    debug!(?params, mode = %mode, "transpiling");

    if matches.get_flag("trace") {
        print!("{}", transpiler.trace(&vars)?);
    } else {
        println!("{}", transpiler.transform(&vars)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_parse_param_type() {
        assert_eq!(
            parse_param_type("x=double"),
            Ok(("x".to_string(), "double".to_string()))
        );
        assert_eq!(
            parse_param_type(" y = unsigned int "),
            Ok(("y".to_string(), "unsigned int".to_string()))
        );
        assert!(parse_param_type("x").is_err());
        assert!(parse_param_type("=int").is_err());
    }

    #[test]
    fn test_output_flags_conflict() {
        let result = cli().try_get_matches_from(["transpile", "f.py", "--trace", "--tree"]);
        assert!(result.is_err());
        let result = cli().try_get_matches_from(["transpile", "f.py", "--json"]);
        assert!(result.is_err());
    }
}
