use super::types::{ChangeKind, ChangepackResult, ChangepackResultMap};
use std::fmt::Write;

/// First line of every status surface the bot owns.
pub const MARKER: &str = "# Changepacks";

/// Title of the version-bump pull request, also used to find past merges.
pub const UPDATE_TITLE: &str = "Update Versions";

const MISSING_LOGS_WARNING: &str = "> [!WARNING]\n\
> This package changed but has no changelog entry. Did you forget to run `changepacks`?";

/// Markdown section for one artifact.
///
/// Empty exactly when the artifact has no logs, is unchanged and has no
/// pending version.
pub fn render_artifact(result: &ChangepackResult) -> String {
    if result.logs.is_empty() && !result.changed && result.next_version.is_none() {
        return String::new();
    }

    let mut section = String::new();
    let _ = write!(section, "## {}", result.display_name());
    match (&result.current_version, &result.next_version) {
        (Some(current), Some(next)) => {
            let _ = write!(section, "@{current} → {next}");
        }
        (None, Some(next)) => {
            let _ = write!(section, " → {next}");
        }
        (Some(current), None) => {
            let _ = write!(section, "@{current}");
        }
        (None, None) => {}
    }
    section.push('\n');

    let notes = release_notes(result);
    if !notes.is_empty() {
        section.push('\n');
        section.push_str(&notes);
    }

    if result.is_missing_logs() {
        section.push('\n');
        section.push_str(MISSING_LOGS_WARNING);
        section.push('\n');
    }

    section
}

/// Major/Minor/Patch lists without the artifact header, used as release bodies.
pub fn release_notes(result: &ChangepackResult) -> String {
    let mut notes = String::new();
    for kind in ChangeKind::ALL {
        let mut entries = result.logs_of(kind).peekable();
        if entries.peek().is_none() {
            continue;
        }
        if !notes.is_empty() {
            notes.push('\n');
        }
        let _ = writeln!(notes, "### {kind}");
        for log in entries {
            let _ = writeln!(notes, "- {}", log.note.trim());
        }
    }
    notes
}

/// Full status body: marker line followed by every non-empty artifact section.
pub fn render_body(results: &ChangepackResultMap) -> String {
    let sections: Vec<String> = results
        .values()
        .map(render_artifact)
        .filter(|section| !section.is_empty())
        .collect();

    let mut body = format!("{MARKER}\n\n");
    if sections.is_empty() {
        body.push_str("No changes detected.\n");
    } else {
        body.push_str(&sections.join("\n"));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changepacks::ChangeLog;
    use proptest::prelude::*;

    fn result(logs: Vec<ChangeLog>, changed: bool, next: Option<&str>) -> ChangepackResult {
        ChangepackResult {
            logs,
            current_version: Some("1.0.0".to_string()),
            next_version: next.map(str::to_string),
            name: Some("pkg".to_string()),
            path: "pkg/package.json".to_string(),
            changed,
        }
    }

    fn log(kind: ChangeKind, note: &str) -> ChangeLog {
        ChangeLog {
            kind,
            note: note.to_string(),
        }
    }

    fn arb_kind() -> impl Strategy<Value = ChangeKind> {
        prop_oneof![
            Just(ChangeKind::Major),
            Just(ChangeKind::Minor),
            Just(ChangeKind::Patch)
        ]
    }

    fn arb_result() -> impl Strategy<Value = ChangepackResult> {
        (
            prop::collection::vec((arb_kind(), "[a-z ]{0,12}"), 0..4),
            any::<bool>(),
            prop::option::of("[0-9]\\.[0-9]\\.[0-9]"),
            prop::option::of("[0-9]\\.[0-9]\\.[0-9]"),
            prop::option::of("[a-z]{1,8}"),
        )
            .prop_map(|(logs, changed, current, next, name)| ChangepackResult {
                logs: logs
                    .into_iter()
                    .map(|(kind, note)| ChangeLog { kind, note })
                    .collect(),
                current_version: current,
                next_version: next,
                name,
                path: "some/path".to_string(),
                changed,
            })
    }

    proptest! {
        #[test]
        fn rendered_section_is_empty_iff_nothing_to_report(result in arb_result()) {
            let nothing = result.logs.is_empty() && !result.changed && result.next_version.is_none();
            prop_assert_eq!(render_artifact(&result).is_empty(), nothing);
        }
    }

    #[test]
    fn test_section_lists_entries_by_kind() {
        let section = render_artifact(&result(
            vec![
                log(ChangeKind::Patch, "Fix crash"),
                log(ChangeKind::Major, "Drop node 16"),
                log(ChangeKind::Patch, "Fix typo"),
            ],
            true,
            Some("2.0.0"),
        ));

        assert_eq!(
            section,
            "## pkg@1.0.0 → 2.0.0\n\n### Major\n- Drop node 16\n\n### Patch\n- Fix crash\n- Fix typo\n"
        );
    }

    #[test]
    fn test_missing_logs_warning() {
        let section = render_artifact(&result(vec![], true, None));
        assert!(section.starts_with("## pkg@1.0.0\n"));
        assert!(section.contains("[!WARNING]"));

        let section = render_artifact(&result(vec![log(ChangeKind::Minor, "Add")], true, Some("1.1.0")));
        assert!(!section.contains("[!WARNING]"));
    }

    #[test]
    fn test_body_starts_with_marker() {
        let mut results = ChangepackResultMap::new();
        results.insert("pkg/package.json".to_string(), result(vec![], false, None));
        assert_eq!(render_body(&results), "# Changepacks\n\nNo changes detected.\n");

        results.insert(
            "other/Cargo.toml".to_string(),
            result(vec![log(ChangeKind::Minor, "Add flag")], true, Some("1.1.0")),
        );
        let body = render_body(&results);
        assert!(body.starts_with(MARKER));
        assert!(body.contains("### Minor\n- Add flag"));
        assert!(!body.contains("No changes detected."));
    }
}
