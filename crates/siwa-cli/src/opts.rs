use gumdrop::Options;
use std::default::Default;

#[derive(Debug, Options, Clone)]
pub struct SiwaOpts {
    help: bool,
    #[options(command)]
    pub command: Option<Command>,
}

// The supported commands
#[derive(Debug, Options, Clone)]
pub enum Command {
    #[options(help = "creates a new keypair for an aggregator or a producer")]
    Keygen(KeygenOpts),

    #[options(help = "bootstraps a network locally, runs the DKG and signs a query")]
    Simulate(SimulateOpts),
}

#[derive(Debug, Options, Clone)]
pub struct KeygenOpts {
    help: bool,

    #[options(help = "path to the file where the keys will be written (stdout if none provided)")]
    pub path: Option<String>,
}

#[derive(Debug, Options, Clone)]
pub struct SimulateOpts {
    help: bool,

    #[options(help = "path to the JSON file describing the aggregator and its producers")]
    pub config: String,

    #[options(help = "the key every producer queries", default = "k1")]
    pub key: String,

    #[options(
        help = "the path where the signed result will be stored (stdout if none provided)"
    )]
    pub output_path: Option<String>,
}
