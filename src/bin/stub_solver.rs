//! Stand-in for the planning solver, used by the integration tests.
//!
//! Accepts the solver command line (`-i <instance> -o <result> -s <name>`
//! plus flags) and picks its behaviour from the solver name.

use std::collections::HashMap;
use std::fs;
use std::process;
use std::thread;
use std::time::Duration;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut instance_file = None;
    let mut output_file = None;
    let mut solver_name = String::new();
    let mut delivery = false;
    let mut extra = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-i" if i + 1 < args.len() => {
                instance_file = Some(args[i + 1].clone());
                i += 1;
            }
            "-o" if i + 1 < args.len() => {
                output_file = Some(args[i + 1].clone());
                i += 1;
            }
            "-s" if i + 1 < args.len() => {
                solver_name = args[i + 1].clone();
                i += 1;
            }
            "-d" => delivery = true,
            "-L" => {}
            other => extra.push(other.to_string()),
        }
        i += 1;
    }

    let (instance_file, output_file) = match (instance_file, output_file) {
        (Some(ins), Some(out)) => (ins, out),
        _ => {
            eprintln!("Usage: {} -i <instance> -o <result> -s <solver> [-d] [-L]", args[0]);
            process::exit(2);
        }
    };

    match solver_name.as_str() {
        "Crash" => process::exit(3),
        "Silent" => return,
        "Hang" => loop {
            thread::sleep(Duration::from_secs(60));
        },
        "Garbage" => {
            fs::write(&output_file, "solved=maybe\nsoc=-5\nmakespan=\n").unwrap_or_else(|e| {
                eprintln!("Error: cannot write {}: {}", output_file, e);
                process::exit(1);
            });
            return;
        }
        _ => {}
    }

    // Read key=value lines; anything else is a start/goal pair
    let content = fs::read_to_string(&instance_file).unwrap_or_else(|e| {
        eprintln!("Error: cannot read {}: {}", instance_file, e);
        process::exit(1);
    });
    let mut params: HashMap<&str, &str> = HashMap::new();
    let mut pairs = 0;
    for line in content.lines() {
        match line.split_once('=') {
            Some((key, value)) => {
                params.insert(key, value);
            }
            None if !line.is_empty() => pairs += 1,
            None => {}
        }
    }

    let agents: u64 = params.get("agents").and_then(|v| v.parse().ok()).unwrap_or(0);
    let mut log = String::new();
    log.push_str(&format!("instance={}\n", instance_file));
    log.push_str(&format!("agents={}\n", agents));
    log.push_str(&format!("map_file={}\n", params.get("map_file").unwrap_or(&"")));
    log.push_str(&format!("solver={}\n", solver_name));
    log.push_str("solved=1\n");
    if delivery {
        log.push_str("service_time=12.5\n");
    } else {
        log.push_str(&format!("soc={}\n", agents * 10));
        log.push_str(&format!("lb_soc={}\n", agents * 9));
    }
    log.push_str(&format!("makespan={}\n", agents + pairs));
    if !delivery {
        log.push_str(&format!("lb_makespan={}\n", agents));
    }
    log.push_str(&format!("comp_time={}\n", extra.len()));
    log.push_str("preprocessing_comp_time=0\n");
    log.push_str("starts=(0,0),\n");
    // Duplicate key: the harness keeps the first one
    log.push_str("solved=0\n");

    fs::write(&output_file, log).unwrap_or_else(|e| {
        eprintln!("Error: cannot write {}: {}", output_file, e);
        process::exit(1);
    });
}
