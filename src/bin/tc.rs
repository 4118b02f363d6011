// cargo run --release --bin tc -- -i <path> -v <numVertices> [-l] [-a {0|1|2}]

use clap::Parser;
use galois_pgas::cli::{run_tc, TcParameters};

fn main() {
    run_tc(TcParameters::parse());
}
