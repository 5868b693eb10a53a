use siwa_cli::{
    actions::{keygen, simulate},
    init_logging,
    opts::{Command, SiwaOpts},
};

use gumdrop::Options;
use std::process;

fn main() {
    let opts = SiwaOpts::parse_args_default_or_exit();

    let command = opts.command.unwrap_or_else(|| {
        eprintln!("No command was provided.");
        eprintln!("{}", SiwaOpts::usage());
        process::exit(2)
    });

    init_logging();

    let res = match command {
        Command::Keygen(opts) => keygen(opts, &mut rand::thread_rng()),
        Command::Simulate(opts) => simulate(opts).map(|_| ()),
    };
    if let Err(err) = res {
        eprintln!("command failed: {:#}", err);
        process::exit(1);
    }
}
