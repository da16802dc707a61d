//! Text dump of the component hierarchy

use std::io::Write;

use itertools::Itertools;

use crate::network::{Circuit, ComponentId};

/// Write every top-level component and its sub-components, indented by level
///
/// Each line gives the component, its kind, its input signals and its output signals:
/// ```text
/// c0 FullAdder: s0, s1, s2 -> s3, s4
///   c1 Xor: s0, s1 -> s5
/// ```
pub fn write_hierarchy<W: Write>(w: &mut W, circuit: &Circuit) -> std::io::Result<()> {
    for c in circuit.top_components() {
        write_component(w, circuit, c, 0)?;
    }
    Ok(())
}

fn write_component<W: Write>(
    w: &mut W,
    circuit: &Circuit,
    c: ComponentId,
    level: usize,
) -> std::io::Result<()> {
    let comp = circuit.component(c);
    let names = |signals: Vec<_>| {
        signals
            .into_iter()
            .map(|s| circuit.signal_name(s))
            .join(", ")
    };
    writeln!(
        w,
        "{:indent$}{} {}: {} -> {}",
        "",
        c,
        comp.kind(),
        names(circuit.input_signals(c)),
        names(circuit.output_signals(c)),
        indent = 2 * level
    )?;
    for child in comp.children() {
        write_component(w, circuit, *child, level + 1)?;
    }
    Ok(())
}
