//! Human-readable media set dumps, for diagnostics and CLI frontends.

use std::fmt::Write;

use crate::media::{MediaSet, NodeId};

/// Renders the media set tree: part number, media span, directories,
/// files with their media, loads with their file lists, and batches.
pub fn print_media_set(media_set: &MediaSet) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Media Set {:?}", media_set.part_number());
    let _ = writeln!(out, "  Media: 1..={}", media_set.last_medium_number());

    print_container(media_set, media_set.root(), 1, &mut out);

    out
}

fn print_container(media_set: &MediaSet, container: NodeId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);

    for &child in media_set.children(container) {
        if media_set.is_directory(child) {
            continue;
        }

        let medium = media_set.effective_medium_number(child);
        let _ = write!(out, "{indent}{} [medium {medium}]", media_set.name(child));

        if let Ok(load) = media_set.load(child) {
            let _ = write!(out, " load pn={:?}", load.part_number);
            let targets: Vec<&str> = load.target_hardware_ids().collect();
            let _ = write!(out, " targets={targets:?}");
            let _ = writeln!(out);
            for file_ref in load.data_files() {
                let _ = writeln!(
                    out,
                    "{indent}  data: {} pn={:?}",
                    media_set.path(file_ref.file),
                    file_ref.part_number,
                );
            }
            for file_ref in load.support_files() {
                let _ = writeln!(
                    out,
                    "{indent}  support: {} pn={:?}",
                    media_set.path(file_ref.file),
                    file_ref.part_number,
                );
            }
        } else if let Ok(batch) = media_set.batch(child) {
            let _ = writeln!(out, " batch pn={:?}", batch.part_number);
            for (target, loads) in batch.targets() {
                let names: Vec<String> =
                    loads.iter().map(|&load| media_set.path(load)).collect();
                let _ = writeln!(out, "{indent}  {target}: {names:?}");
            }
        } else {
            let _ = writeln!(out);
        }
    }

    for &child in media_set.children(container) {
        if media_set.is_directory(child) {
            let _ = writeln!(out, "{indent}{}\\", media_set.name(child));
            print_container(media_set, child, depth + 1, out);
        }
    }
}
