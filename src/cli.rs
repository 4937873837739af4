use crate::data::ValidationSeverity;
use crate::engine::Engine;
use crate::indicators::{topological_order, Constant, Indicator, Node};
use crate::logging;
use crate::server;
use crate::settings::Settings;

const USAGE: &str = "usage: pdq <serve|batch|reload|validate|eval|graph>";
const EVAL_USAGE: &str = "usage: pdq eval <indicator> [<year> <country>]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Batch,
    Reload,
    Validate,
    Eval,
    Graph,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("batch") => Some(Command::Batch),
        Some("reload") => Some(Command::Reload),
        Some("validate") => Some(Command::Validate),
        Some("eval") => Some(Command::Eval),
        Some("graph") => Some(Command::Graph),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return 2;
    };

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("invalid settings: {err}");
            return 2;
        }
    };
    logging::init(settings.log_format);

    match command {
        Command::Serve => handle_serve(&settings),
        Command::Batch => handle_batch(&settings),
        Command::Reload => handle_reload(&settings),
        Command::Validate => handle_validate(&settings),
        Command::Eval => handle_eval(&settings, args),
        Command::Graph => handle_graph(),
    }
}

fn handle_serve(settings: &Settings) -> i32 {
    match server::run_server(settings) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn loaded_engine(settings: &Settings) -> Result<Engine, i32> {
    let mut engine = Engine::new(settings);
    match engine.reload() {
        Ok(_) => Ok(engine),
        Err(err) => {
            eprintln!("load failed: {err}");
            Err(1)
        }
    }
}

fn handle_batch(settings: &Settings) -> i32 {
    let mut engine = match loaded_engine(settings) {
        Ok(engine) => engine,
        Err(code) => return code,
    };
    let report = engine.run_batch();
    let code = if report.write_errors.is_empty() { 0 } else { 1 };
    print_json(&report).unwrap_or(1).max(code)
}

fn handle_reload(settings: &Settings) -> i32 {
    let mut engine = Engine::new(settings);
    match engine.reload() {
        Ok(report) => print_json(&report).unwrap_or(1),
        Err(err) => {
            eprintln!("load failed: {err}");
            1
        }
    }
}

fn handle_validate(settings: &Settings) -> i32 {
    let engine = match loaded_engine(settings) {
        Ok(engine) => engine,
        Err(code) => return code,
    };
    let report = engine.validate();
    for diagnostic in &report.diagnostics {
        println!("{diagnostic}");
    }
    println!(
        "validation: errors={}, warnings={}, info={}",
        report.count(ValidationSeverity::Error),
        report.count(ValidationSeverity::Warning),
        report.count(ValidationSeverity::Info)
    );
    if report.has_errors() {
        1
    } else {
        0
    }
}

fn handle_eval(settings: &Settings, args: &[String]) -> i32 {
    let Some(name) = args.get(2) else {
        eprintln!("{EVAL_USAGE}");
        return 2;
    };

    if let Some(constant) = Constant::from_name(name) {
        let mut engine = match loaded_engine(settings) {
            Ok(engine) => engine,
            Err(code) => return code,
        };
        let value = engine.constant(constant);
        return print_json(&serde_json::json!({ "name": name, "value": value })).unwrap_or(1);
    }

    let Some(indicator) = Indicator::from_name(name) else {
        eprintln!("unknown indicator '{name}'");
        return 2;
    };
    let (Some(year), Some(country)) = (args.get(3), args.get(4)) else {
        eprintln!("{EVAL_USAGE}");
        return 2;
    };
    let Ok(year) = year.parse::<i32>() else {
        eprintln!("invalid year '{year}'");
        return 2;
    };

    let mut engine = match loaded_engine(settings) {
        Ok(engine) => engine,
        Err(code) => return code,
    };
    let value = engine.value(indicator, year, country);
    print_json(&serde_json::json!({
        "name": name,
        "year": year,
        "country": country,
        "value": value,
    }))
    .unwrap_or(1)
}

fn handle_graph() -> i32 {
    let nodes: Vec<serde_json::Value> = topological_order()
        .into_iter()
        .map(|node| {
            let kind = match node {
                Node::Table(_) => "table",
                Node::Indicator(_) => "indicator",
                Node::Constant(_) => "constant",
            };
            let deps: Vec<&str> = node.dependencies().iter().map(Node::name).collect();
            serde_json::json!({ "name": node.name(), "kind": kind, "dependencies": deps })
        })
        .collect();
    print_json(&nodes).unwrap_or(1)
}

fn print_json<T: serde::Serialize>(value: &T) -> Option<i32> {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            Some(0)
        }
        Err(err) => {
            eprintln!("failed to serialize output: {err}");
            None
        }
    }
}
