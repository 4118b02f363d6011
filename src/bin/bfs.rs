// cargo run --release --bin bfs -- -n <numVertices> -f <path> -s <srcVertex>...

use clap::Parser;
use galois_pgas::cli::{run_bfs, BfsParameters};

fn main() {
    run_bfs(BfsParameters::parse());
}
