use nih_plug::prelude::*;

use simple_fuzz::SimpleFuzz;

fn main() {
    nih_export_standalone::<SimpleFuzz>();
}
