extern crate clap;

use clap::Parser;
use galois_pgas::cli::Cli;

pub fn main() {
    Cli::parse().run();
}
