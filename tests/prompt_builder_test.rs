//! Integration tests for prompt size bounds over real repository diffs.

mod common;

use common::TestRepo;
use diffscribe::git::{self, DiffScope};
use diffscribe::prompt::TRUNCATION_MARKER;
use diffscribe::{ChangeSet, PromptBuilder, PromptError, SuggestionKind};

const KINDS: [SuggestionKind; 3] = [
    SuggestionKind::Branch,
    SuggestionKind::Commit,
    SuggestionKind::PullRequest,
];

/// Stage several large files and collect the staged diff.
fn large_staged_change_set(test_repo: &TestRepo) -> ChangeSet {
    for file in 0..6 {
        let content: String = (0..400)
            .map(|line| format!("pub const VALUE_{file}_{line}: u32 = {line};\n"))
            .collect();
        let path = format!("src/generated_{file}.rs");
        test_repo.write(&path, &content);
        test_repo.stage(&path);
    }
    git::collect(&test_repo.repo, DiffScope::Staged, None).expect("Failed to collect diff")
}

#[test]
fn test_prompt_never_exceeds_cap() {
    let test_repo = TestRepo::with_initial_commit();
    let change_set = large_staged_change_set(&test_repo);
    assert!(change_set.diff_text.chars().count() > 50_000);

    for max in [2_500, 4_000, 8_000, 12_000, 30_000] {
        for kind in KINDS {
            let prompt = PromptBuilder::new(max, 3)
                .build(kind, &change_set, None)
                .unwrap_or_else(|e| panic!("{kind} prompt at {max} failed: {e}"));

            assert!(prompt.len() <= max, "{kind} prompt is {} chars, cap {max}", prompt.len());
            assert!(prompt.truncated);
            assert!(prompt.body.ends_with(TRUNCATION_MARKER));
            assert!(prompt.body.starts_with("diff --git "));
        }
    }
}

#[test]
fn test_small_diff_sent_whole() {
    let test_repo = TestRepo::with_initial_commit();
    test_repo.write("src/lib.rs", "pub fn answer() -> u32 {\n    42\n}\n");
    test_repo.stage("src/lib.rs");
    let change_set = git::collect(&test_repo.repo, DiffScope::Staged, None).unwrap();

    let prompt = PromptBuilder::default()
        .build(SuggestionKind::Commit, &change_set, None)
        .unwrap();

    assert!(!prompt.truncated);
    assert_eq!(prompt.body, change_set.diff_text);
    assert!(prompt.instructions.contains("- src/lib.rs (added)"));
    assert!(prompt.text().ends_with("+    42\n+}\n"));
}

#[test]
fn test_build_is_deterministic() {
    let test_repo = TestRepo::with_initial_commit();
    let change_set = large_staged_change_set(&test_repo);
    let builder = PromptBuilder::new(6_000, 3);

    for kind in KINDS {
        let first = builder.build(kind, &change_set, None).unwrap();
        let second = builder.build(kind, &change_set, None).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_cap_below_instructions_is_an_error() {
    let test_repo = TestRepo::with_initial_commit();
    let change_set = large_staged_change_set(&test_repo);

    let err = PromptBuilder::new(200, 3)
        .build(SuggestionKind::PullRequest, &change_set, None)
        .unwrap_err();

    match err {
        PromptError::InstructionsTooLong { length, max } => {
            assert_eq!(max, 200);
            assert!(length > 200);
        }
    }
}
