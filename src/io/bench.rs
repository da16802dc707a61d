//! IO for .bench (ISCAS) files

use std::io::{BufRead, BufReader, Read, Write};

use fxhash::FxHashMap;
use itertools::Itertools;

use crate::error::{Result, SimError};
use crate::network::{Circuit, ComponentKind, LogicValue, NaryType, Primitive, SignalId};

/// A circuit read from a file, with its primary inputs and outputs
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    /// The elaborated circuit
    pub circuit: Circuit,
    /// Primary inputs, in declaration order
    pub inputs: Vec<SignalId>,
    /// Primary outputs, in declaration order
    pub outputs: Vec<SignalId>,
}

/// A gate statement: output name, gate type and input names, with its line
struct Statement {
    line: usize,
    output: String,
    gate: String,
    deps: Vec<String>,
}

fn parse_error(line: usize, msg: String) -> SimError {
    SimError::Parse { line, msg }
}

/// Gate types and their required arity
fn gate_kind(statement: &Statement) -> Result<ComponentKind> {
    use Primitive::*;
    let nb_deps = statement.deps.len();
    let expect = |n: usize, p: Primitive| {
        if nb_deps == n {
            Ok(ComponentKind::Primitive(p))
        } else {
            Err(parse_error(
                statement.line,
                format!("{} expects {} inputs, got {}", statement.gate, n, nb_deps),
            ))
        }
    };
    match statement.gate.to_uppercase().as_str() {
        "BUF" | "BUFF" => expect(1, Buf),
        "NOT" => expect(1, Not),
        "VDD" => expect(0, Constant(LogicValue::One)),
        "VSS" | "GND" => expect(0, Constant(LogicValue::Zero)),
        "UNDEF" => expect(0, Constant(LogicValue::Unknown)),
        "HIGHZ" => expect(0, Constant(LogicValue::HighZ)),
        "MUX" => expect(3, Mux),
        "MAJ" => expect(3, Maj),
        "TRISTATE" => expect(2, Tristate),
        "AND" => Ok(ComponentKind::Primitive(Nary(NaryType::And))),
        "NAND" => Ok(ComponentKind::Primitive(Nary(NaryType::Nand))),
        "OR" => Ok(ComponentKind::Primitive(Nary(NaryType::Or))),
        "NOR" => Ok(ComponentKind::Primitive(Nary(NaryType::Nor))),
        "XOR" => Ok(ComponentKind::Primitive(Nary(NaryType::Xor))),
        "XNOR" => Ok(ComponentKind::Primitive(Nary(NaryType::Xnor))),
        "DFF" | "DFFRSE" => Err(parse_error(
            statement.line,
            "sequential elements are not supported".to_string(),
        )),
        _ => Err(parse_error(
            statement.line,
            format!("Unknown gate type {}", statement.gate),
        )),
    }
}

fn netlist_from_statements(
    statements: &[Statement],
    inputs: &[(usize, String)],
    outputs: &[(usize, String)],
) -> Result<Netlist> {
    let mut ret = Netlist::default();
    let circuit = &mut ret.circuit;

    // One signal per name, before any gate is bound
    let mut name_to_sig = FxHashMap::default();
    let defined = inputs
        .iter()
        .map(|(line, name)| (*line, name))
        .chain(statements.iter().map(|s| (s.line, &s.output)));
    for (line, name) in defined {
        let s = circuit.add_signal();
        circuit.set_name(s, name);
        if name_to_sig.insert(name.clone(), s).is_some() {
            return Err(parse_error(line, format!("{name} is defined twice")));
        }
    }
    for (_, name) in inputs {
        ret.inputs.push(name_to_sig[name]);
    }

    // ABC-style naming for constant signals
    for (name, value) in [("vdd", LogicValue::One), ("gnd", LogicValue::Zero)] {
        let used = statements.iter().any(|s| s.deps.iter().any(|d| d == name))
            || outputs.iter().any(|(_, o)| o == name);
        if used && !name_to_sig.contains_key(name) {
            let s = circuit.constant(value)?;
            circuit.set_name(s, name);
            name_to_sig.insert(name.to_string(), s);
        }
    }

    for s in statements {
        let kind = gate_kind(s)?;
        let mut deps = Vec::new();
        for d in &s.deps {
            match name_to_sig.get(d) {
                Some(sig) => deps.push(*sig),
                None => {
                    return Err(parse_error(
                        s.line,
                        format!("Gate input {d} is not generated anywhere"),
                    ))
                }
            }
        }
        circuit.add_component(kind, &deps, &[name_to_sig[&s.output]])?;
    }
    for (line, o) in outputs {
        match name_to_sig.get(o) {
            Some(sig) => ret.outputs.push(*sig),
            None => {
                return Err(parse_error(
                    *line,
                    format!("Output {o} is not generated anywhere"),
                ))
            }
        }
    }
    Ok(ret)
}

/// Read a circuit in .bench format, as used by the ISCAS benchmarks
///
/// These files describe the design with simple statements like:
/// ```text
///     # This is a comment
///     INPUT(i0)
///     INPUT(i1)
///     x0 = AND(i0, i1)
///     x1 = NAND(x0, i1)
///     x2 = OR(x0, i0)
///     x3 = NOR(i0, x1)
///     x4 = XOR(x3, x2)
///     x5 = BUF(x4)
///     x6 = NOT(x5)
///     x7 = gnd
///     x8 = vdd
///     x9 = TRISTATE(x0, x8)
///     OUTPUT(x0)
/// ```
/// Gates may be used before they are defined. Flip-flops are rejected.
pub fn read_bench<R: Read>(r: R) -> Result<Netlist> {
    let mut statements = Vec::new();
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    for (i, l) in BufReader::new(r).lines().enumerate() {
        let line = i + 1;
        let s = l?;
        let t = s.trim();
        if t.is_empty() || t.starts_with('#') {
            continue;
        }
        if !t.contains('=') {
            let parts: Vec<_> = t
                .split(&['(', ')'])
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            if parts.len() != 2 {
                return Err(parse_error(line, format!("Invalid statement {t}")));
            }
            if ["INPUT", "PINPUT"].contains(&parts[0]) {
                inputs.push((line, parts[1].to_string()));
            } else if ["OUTPUT", "POUTPUT"].contains(&parts[0]) {
                outputs.push((line, parts[1].to_string()));
            } else {
                return Err(parse_error(line, format!("Unknown keyword {}", parts[0])));
            }
        } else {
            let parts: Vec<_> = t
                .split(&['=', '(', ',', ')'])
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect();
            if parts.len() < 2 {
                return Err(parse_error(line, format!("Invalid statement {t}")));
            }
            let mut it = parts.into_iter();
            let output = it.next().unwrap_or_default();
            let gate = it.next().unwrap_or_default();
            statements.push(Statement {
                line,
                output,
                gate,
                deps: it.collect(),
            });
        }
    }
    netlist_from_statements(&statements, &inputs, &outputs)
}

/// Gate name of a primitive in .bench files
fn gate_name(p: Primitive) -> &'static str {
    use Primitive::*;
    match p {
        Constant(LogicValue::Zero) => "gnd",
        Constant(LogicValue::One) => "vdd",
        Constant(LogicValue::Unknown) => "UNDEF",
        Constant(LogicValue::HighZ) => "HIGHZ",
        Buf => "BUF",
        Not => "NOT",
        Nary(NaryType::And) => "AND",
        Nary(NaryType::Or) => "OR",
        Nary(NaryType::Nand) => "NAND",
        Nary(NaryType::Nor) => "NOR",
        Nary(NaryType::Xor) => "XOR",
        Nary(NaryType::Xnor) => "XNOR",
        Mux => "MUX",
        Maj => "MAJ",
        Tristate => "TRISTATE",
    }
}

/// Write a circuit in .bench format, flattening structural components into their primitives
///
/// Signals are named after their name if they have one, or their index otherwise. The circuit
/// is only read.
pub fn write_bench<W: Write>(
    w: &mut W,
    circuit: &Circuit,
    inputs: &[SignalId],
    outputs: &[SignalId],
) -> std::io::Result<()> {
    writeln!(w, "# .bench (ISCAS) file")?;
    writeln!(w, "# Generated by tetrasim")?;
    for s in inputs {
        writeln!(w, "INPUT({})", circuit.signal_name(*s))?;
    }
    writeln!(w)?;
    for s in outputs {
        writeln!(w, "OUTPUT({})", circuit.signal_name(*s))?;
    }
    writeln!(w)?;
    for c in circuit.component_ids() {
        let comp = circuit.component(c);
        assert!(comp.is_elaborated(), "{c} is not elaborated");
        let p = match comp.kind() {
            ComponentKind::Primitive(p) => p,
            ComponentKind::Structural(_) => continue,
        };
        let out = circuit.signal_name(circuit.output_signals(c)[0]);
        if let Primitive::Constant(_) = p {
            // Constants named after themselves are implicit
            if out != gate_name(p) {
                writeln!(w, "{} = {}", out, gate_name(p))?;
            }
            continue;
        }
        let rep = circuit
            .input_signals(c)
            .iter()
            .map(|s| circuit.signal_name(*s))
            .join(", ");
        writeln!(w, "{} = {}({})", out, gate_name(p), rep)?;
    }
    Ok(())
}
