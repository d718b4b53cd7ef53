//! Reading and writing automata in the three formats of the external
//! interface (spec.md §6): process-algebra text via an external helper,
//! explicit automaton JSON, and FSM text. The FSM text format doubles as
//! the canonical on-disk form used for the round-trip/idempotence tests
//! of spec.md §8, since its per-state blocks already carry everything
//! the canonical form requires (state id, marked flag, out-degree, and
//! per-transition event/target/controllable/observable tags).

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use fs_err as fs;
use serde::Deserialize;

use super::{Automaton, TAU};
use crate::error::{EngineError, Result};

/// The `process`/`alphabet`/`transitions` shape of the explicit automaton
/// JSON format. Marking is implicit: every state is marked.
#[derive(Debug, Deserialize)]
struct ExplicitJson {
    #[allow(dead_code)]
    process: Option<String>,
    alphabet: Vec<String>,
    transitions: Vec<[usize; 3]>,
}

/// Reads an automaton from the explicit automaton JSON format.
pub fn read_json(path: &Path) -> Result<Automaton> {
    let contents = fs::read_to_string(path)?;
    read_json_str(&contents, path)
}

/// Parses an automaton from a JSON string already in memory, e.g. the
/// stdout of the external `.lts` converter.
pub fn read_json_str(contents: &str, path_for_errors: &Path) -> Result<Automaton> {
    let parsed: ExplicitJson =
        serde_json::from_str(contents).map_err(|source| EngineError::Json {
            path: path_for_errors.to_owned(),
            source,
        })?;
    let mut automaton = Automaton::new(parsed.alphabet.clone());
    let max_state = parsed
        .transitions
        .iter()
        .flat_map(|t| [t[0], t[2]])
        .max()
        .unwrap_or(0);
    while automaton.num_states() <= max_state {
        automaton.add_state(false);
    }
    for t in &parsed.transitions {
        let [src, event, dst] = *t;
        if event >= parsed.alphabet.len() {
            return Err(EngineError::MalformedInput {
                path: path_for_errors.to_owned(),
                reason: format!("event index {} out of range of alphabet", event),
            });
        }
        automaton.add_transition(src, event, dst);
    }
    automaton.mark_all_states();
    Ok(automaton)
}

/// Writes an automaton to the explicit automaton JSON format.
pub fn write_json<W: Write>(automaton: &Automaton, name: &str, mut writer: W) -> Result<()> {
    let mut transitions = Vec::new();
    for state in 0..automaton.num_states() {
        for &(event, target) in automaton.out_edges(state) {
            transitions.push([state, event, target]);
        }
    }
    let obj = serde_json::json!({
        "process": name,
        "alphabet": automaton.alphabet(),
        "transitions": transitions,
    });
    writer.write_all(serde_json::to_string(&obj)?.as_bytes())?;
    Ok(())
}

fn tag(name: &str, c_label: &str, uc_label: &str) -> Result<bool> {
    match name {
        s if s == c_label => Ok(true),
        s if s == uc_label => Ok(false),
        other => Err(EngineError::Domain(format!("unexpected tag '{}'", other))),
    }
}

/// Reads an automaton from the FSM text format, which also serves as the
/// canonical on-disk form.
pub fn read_fsm<R: std::io::Read>(reader: R, path_for_errors: &Path) -> Result<Automaton> {
    let mut lines = BufReader::new(reader).lines();
    let malformed = |reason: String| EngineError::MalformedInput {
        path: path_for_errors.to_owned(),
        reason,
    };
    let count_line = lines
        .next()
        .ok_or_else(|| malformed("empty FSM file".to_owned()))??;
    let num_states: usize = count_line
        .trim()
        .parse()
        .map_err(|_| malformed("invalid state count".to_owned()))?;

    let mut automaton = Automaton::new(vec![TAU.to_owned()]);
    for _ in 0..num_states {
        automaton.add_state(false);
    }

    for state in 0..num_states {
        // skip the blank separator line
        let blank = lines
            .next()
            .ok_or_else(|| malformed("unexpected end of file".to_owned()))??;
        if !blank.trim().is_empty() {
            return Err(malformed(format!(
                "expected blank line before state {}",
                state
            )));
        }
        let header = lines
            .next()
            .ok_or_else(|| malformed("unexpected end of file".to_owned()))??;
        let fields: Vec<&str> = header.split('\t').collect();
        if fields.len() != 3 {
            return Err(malformed(format!("malformed state header '{}'", header)));
        }
        let marked = fields[1].trim() == "1";
        automaton.set_marked(state, marked);
        let out_degree: usize = fields[2]
            .trim()
            .parse()
            .map_err(|_| malformed("invalid out-degree".to_owned()))?;

        for _ in 0..out_degree {
            let line = lines
                .next()
                .ok_or_else(|| malformed("unexpected end of file".to_owned()))??;
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 4 {
                return Err(malformed(format!("malformed transition line '{}'", line)));
            }
            let label = fields[0];
            let dst_field = fields[1].trim();
            let dst: usize = dst_field
                .strip_prefix("State")
                .ok_or_else(|| malformed(format!("malformed target '{}'", dst_field)))?
                .parse()
                .map_err(|_| malformed(format!("malformed target '{}'", dst_field)))?;
            let controllable = tag(fields[2].trim(), "c", "uc")
                .map_err(|_| malformed(format!("malformed controllable tag in '{}'", line)))?;
            let observable = tag(fields[3].trim(), "o", "uo")
                .map_err(|_| malformed(format!("malformed observable tag in '{}'", line)))?;

            let event = automaton.ensure_event(label);
            if controllable {
                automaton.mark_controllable([label]);
            }
            if observable {
                automaton.mark_observable([label]);
            }
            automaton.add_transition(state, event, dst);
        }
    }
    Ok(automaton)
}

/// Writes an automaton to the FSM text format / canonical on-disk form.
pub fn write_fsm<W: Write>(automaton: &Automaton, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", automaton.num_states())?;
    for state in 0..automaton.num_states() {
        writeln!(writer)?;
        writeln!(
            writer,
            "State{}\t{}\t{}",
            state,
            if automaton.is_marked(state) { 1 } else { 0 },
            automaton.out_edges(state).len()
        )?;
        for &(event, target) in automaton.out_edges(state) {
            let label = &automaton.alphabet()[event];
            let c_tag = if automaton.is_controllable(event) {
                "c"
            } else {
                "uc"
            };
            let o_tag = if automaton.is_observable(event) {
                "o"
            } else {
                "uo"
            };
            writeln!(writer, "{}\tState{}\t{}\t{}", label, target, c_tag, o_tag)?;
        }
    }
    Ok(())
}

/// Converts a process-algebra `.lts` file to automaton JSON by invoking
/// an external helper and treats its stdout as opaque JSON, as spec.md
/// §6 specifies. `helper` is the path to the conversion executable
/// (e.g. a `robustness-calculator.jar` wrapper script); it is invoked as
/// `helper convert --lts <path>`.
pub fn convert_lts(helper: &Path, path: &Path) -> Result<Automaton> {
    let output = Command::new(helper)
        .arg("convert")
        .arg("--lts")
        .arg(path)
        .output()?;
    if !output.status.success() {
        return Err(EngineError::ExternalTool {
            path: path.to_owned(),
            exit_code: output.status.code(),
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    read_json_str(&stdout, path)
}

/// Joins `dir` and `name` into a path inside the staging directory.
pub fn staging_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Automaton;
    use std::path::Path;

    fn sample() -> Automaton {
        let mut a = Automaton::new(vec![TAU.to_owned()]);
        a.mark_controllable(["a"]);
        a.mark_observable(["a"]);
        let s1 = a.add_state(true);
        let e = a.ensure_event("a");
        a.add_transition(0, e, s1);
        a
    }

    #[test]
    fn fsm_round_trip_preserves_language() {
        let original = sample();
        let mut buf = Vec::new();
        write_fsm(&original, &mut buf).unwrap();
        let reloaded = read_fsm(&buf[..], Path::new("<mem>")).unwrap();
        assert!(original.language_equal(&reloaded).unwrap());
        assert_eq!(
            reloaded.is_controllable(reloaded.event_index("a").unwrap()),
            true
        );
        assert_eq!(
            reloaded.is_observable(reloaded.event_index("a").unwrap()),
            true
        );
    }

    #[test]
    fn json_round_trip_marks_all_states() {
        let original = sample();
        let mut buf = Vec::new();
        write_json(&original, "test", &mut buf).unwrap();
        let reloaded = read_json_str(std::str::from_utf8(&buf).unwrap(), Path::new("<mem>")).unwrap();
        assert!(reloaded.is_marked(0));
        assert!(reloaded.is_marked(1));
    }
}
