use makeproject::context::TokenContext;
use makeproject::error::{Error, Result, TemplateKind};
use makeproject::library::MemoryLibrary;
use makeproject::node::Node;
use makeproject::substitute::Substituter;
use makeproject::tree::TreeBuilder;

fn build(text: &str, library: &MemoryLibrary, context: &TokenContext) -> Result<Option<Node>> {
    let substituter = Substituter::default();
    let builder = TreeBuilder::new(&substituter, library);
    builder.build_source("root", text, context, &[])
}

fn build_tree(text: &str, library: &MemoryLibrary, context: &TokenContext) -> Node {
    build(text, library, context)
        .unwrap()
        .expect("document has an item list")
}

#[test_log::test]
fn test_file_with_inline_content() {
    let context = TokenContext::new("Demo", "");
    let root = build_tree(
        "- file: \"{mp:Title}.md\"\n  content: \"# {mp:Title}\"\n",
        &MemoryLibrary::new(),
        &context,
    );

    assert_eq!(root.name, "Demo");
    assert!(root.is_folder);
    assert_eq!(root.children, vec![Node::file("Demo.md", "# Demo")]);
}

#[test]
fn test_shorthand_folder_keeps_order() {
    let context = TokenContext::new("X", "");
    let root = build_tree("- {mp:Title}:\n  - a.txt\n  - b.txt\n", &MemoryLibrary::new(), &context);

    assert_eq!(
        root.children,
        vec![Node::folder(
            "X",
            vec![Node::file("a.txt", ""), Node::file("b.txt", "")]
        )]
    );
}

#[test]
fn test_untitled_root_is_named_project() {
    let root = build_tree("- a.txt\n", &MemoryLibrary::new(), &TokenContext::new("", ""));
    assert_eq!(root.name, "Project");
}

#[test]
fn test_document_without_item_list_builds_nothing() {
    let context = TokenContext::new("Demo", "");
    assert!(build("title: Demo\n", &MemoryLibrary::new(), &context)
        .unwrap()
        .is_none());
    assert!(build("", &MemoryLibrary::new(), &context).unwrap().is_none());

    let root = build_tree("files:\n  - a.txt\n", &MemoryLibrary::new(), &context);
    assert_eq!(root.children, vec![Node::file("a.txt", "")]);
}

#[test]
fn test_leaf_count_spans_folders_and_includes() {
    let library = MemoryLibrary::new()
        .with_project("docs", "- guide.md\n- folder: api\n  contents:\n    - index.md\n")
        .with_file("main.py", "print('hi')\n");
    let text = r#"
- README.md
- file: LICENSE
  content: MIT
- folder: src
  contents:
    - file_template: main.py
    - folder: empty
- project_template: docs
- notes:
  - a.txt
  - b.txt
"#;
    let root = build_tree(text, &library, &TokenContext::new("Demo", ""));

    assert_eq!(root.file_count(), 7);
    assert_eq!(
        root.render_tree(),
        "Demo/\n  README.md\n  LICENSE\n  src/\n    main.py\n    empty/\n  guide.md\n  api/\n    index.md\n  notes/\n    a.txt\n    b.txt\n"
    );
}

#[test]
fn test_file_template_sees_file_scope() {
    let library = MemoryLibrary::new().with_file(
        "main.py",
        "# {mp:filename} ({mp:file_stem}, {mp:file_ext}) for {mp:Title}\n",
    );
    let root = build_tree("- file_template: main.py\n", &library, &TokenContext::new("Demo", ""));

    assert_eq!(
        root.children,
        vec![Node::file("main.py", "# main.py (main, py) for Demo\n")]
    );
}

#[test]
fn test_file_from_named_template() {
    let library = MemoryLibrary::new().with_file("readme", "# {mp:title}\n{mp:filename}\n");
    let root = build_tree(
        "- file: README.md\n  template: readme\n",
        &library,
        &TokenContext::new("Demo", ""),
    );

    assert_eq!(root.children, vec![Node::file("README.md", "# Demo\nREADME.md\n")]);
}

#[test]
fn test_project_template_overrides_and_attribution() {
    let library = MemoryLibrary::new().with_project("sub", "- \"{mp:title}.md\"\n- \"{mp:formatted_name}.txt\"\n");
    let root = build_tree(
        "- project_template: sub\n  title: Inner Part\n- \"{mp:title}.md\"\n",
        &library,
        &TokenContext::new("Outer", ""),
    );

    let names: Vec<&str> = root.children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Inner Part.md", "inner_part.txt", "Outer.md"]);
    assert_eq!(root.children[0].source_template.as_deref(), Some("sub"));
    assert_eq!(root.children[2].source_template, None);
}

#[test]
fn test_cyclic_include_names_the_chain() {
    let library = MemoryLibrary::new()
        .with_project("A", "- project_template: B\n")
        .with_project("B", "- x.txt\n- project_template: A\n");
    let substituter = Substituter::default();
    let builder = TreeBuilder::new(&substituter, &library);

    let err = builder
        .build_source("A", "- project_template: B\n", &TokenContext::new("", ""), &["A".to_string()])
        .unwrap_err();

    match err.root_cause() {
        Error::CyclicInclude { chain } => assert_eq!(chain, &["A", "B", "A"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("A -> B -> A"));
    assert_eq!(err.document(), Some("B"));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_cycle_through_root_document() {
    let library = MemoryLibrary::new()
        .with_project("A", "- project_template: B\n")
        .with_project("B", "- project_template: A\n");
    let err = build("- project_template: A\n", &library, &TokenContext::new("", "")).unwrap_err();

    match err.root_cause() {
        Error::CyclicInclude { chain } => assert_eq!(chain, &["A", "B", "A"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_token_regardless_of_case() {
    for text in ["- a.txt\n- \"{mp:DoesNotExist}.txt\"\n", "- a.txt\n- \"{mp:doesnotexist}.txt\"\n"] {
        let err = build(text, &MemoryLibrary::new(), &TokenContext::new("Demo", "")).unwrap_err();
        match err.root_cause() {
            Error::UnknownToken { name } => assert!(name.eq_ignore_ascii_case("DoesNotExist")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.document(), Some("root"));
        assert_eq!(err.line(), Some(2));
    }
}

#[test]
fn test_unknown_token_in_sub_template_is_located_there() {
    let library = MemoryLibrary::new().with_project("sub", "- ok.txt\n- folder: x\n  contents:\n    - \"{mp:nope}\"\n");
    let err = build("- project_template: sub\n", &library, &TokenContext::new("", "")).unwrap_err();

    assert_eq!(err.document(), Some("sub"));
    assert_eq!(err.line(), Some(4));
}

#[test]
fn test_missing_templates() {
    let context = TokenContext::new("", "");
    let err = build("- project_template: nowhere\n", &MemoryLibrary::new(), &context).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::MissingTemplate { kind: TemplateKind::Project, name } if name == "nowhere"
    ));

    let err = build("- file_template: nothing.txt\n", &MemoryLibrary::new(), &context).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::MissingTemplate { kind: TemplateKind::File, name } if name == "nothing.txt"
    ));
}

#[test]
fn test_malformed_shorthand_names_the_key() {
    let err = build("- a.txt\n- docs: notes.md\n", &MemoryLibrary::new(), &TokenContext::new("", ""))
        .unwrap_err();

    assert!(matches!(err.root_cause(), Error::MalformedShorthand { key } if key == "docs"));
    assert_eq!(err.line(), Some(2));
}

#[test]
fn test_unrecognized_mapping_is_ignored() {
    let root = build_tree(
        "- a.txt\n- {color: red, size: 2}\n",
        &MemoryLibrary::new(),
        &TokenContext::new("", ""),
    );
    assert_eq!(root.children, vec![Node::file("a.txt", "")]);
}

#[test]
fn test_names_are_sanitized() {
    let context = TokenContext::new("a/b", "");
    let root = build_tree("- \"{mp:title}?.md\"\n- folder: \"..\"\n", &MemoryLibrary::new(), &context);

    assert_eq!(root.name, "a_b");
    assert_eq!(root.children[0].name, "a_b_.md");
    assert_eq!(root.children[1].name, "Untitled");
}

#[test]
fn test_code_token_in_content() {
    let root = build_tree(
        "- file: answer.txt\n  content: \"{mp.py: 6 * 7} {mp.py: context.title | upper}\"\n",
        &MemoryLibrary::new(),
        &TokenContext::new("demo", ""),
    );
    assert_eq!(root.children, vec![Node::file("answer.txt", "42 DEMO")]);
}

#[test_log::test]
fn test_python_block_result_list() {
    let text = r#"
- python: |
    {% set result = ["a.txt", {"folder": "docs", "contents": ["b.md"]}] %}
"#;
    let root = build_tree(text, &MemoryLibrary::new(), &TokenContext::new("", ""));

    assert_eq!(
        root.children,
        vec![
            Node::file("a.txt", ""),
            Node::folder("docs", vec![Node::file("b.md", "")]),
        ]
    );
}

#[test]
fn test_python_block_printed_items() {
    let text = r#"
- python: |
    {% for i in range(3) %}
    - file: "Quiz {{ i }}.tex"
      content: "Quiz {{ i }} for {mp:title}"
    {% endfor %}
"#;
    let root = build_tree(text, &MemoryLibrary::new(), &TokenContext::new("Algebra", ""));

    assert_eq!(
        root.children,
        vec![
            Node::file("Quiz 0.tex", "Quiz 0 for Algebra"),
            Node::file("Quiz 1.tex", "Quiz 1 for Algebra"),
            Node::file("Quiz 2.tex", "Quiz 2 for Algebra"),
        ]
    );
}

#[test]
fn test_python_block_errors() {
    let context = TokenContext::new("", "");
    let err = build("- python: \"{% set result = 3 %}\"\n", &MemoryLibrary::new(), &context)
        .unwrap_err();
    assert!(matches!(err.root_cause(), Error::InvalidItems { .. }));

    let err = build("- python: \"{{ 1 + 'a' }}\"\n", &MemoryLibrary::new(), &context).unwrap_err();
    assert!(matches!(err.root_cause(), Error::CodeExecution { .. }));

    let err = build(
        "- python: |\n    {% set result = [\"{mp:missing}\"] %}\n",
        &MemoryLibrary::new(),
        &context,
    )
    .unwrap_err();
    assert_eq!(err.document(), Some("python block"));
}

#[test]
fn test_custom_tokens_and_preamble() {
    let config = makeproject::config::parse_config(
        r#"
custom_tokens:
  author: Ada
  year:
    type: python
    value: "2000 + 26"
"#,
    )
    .unwrap();
    let tokens = config.tokens().unwrap();
    let context = TokenContext::new("Demo", "").with_custom_tokens(&tokens);
    let substituter =
        Substituter::default().with_preamble(Some("{% macro banner(s) %}== {{ s }} =={% endmacro %}"));
    let library = MemoryLibrary::new();
    let builder = TreeBuilder::new(&substituter, &library);

    let root = builder
        .build_source(
            "root",
            "- file: NOTICE\n  content: \"{mp:Author} {mp:year} {mp.py|{{ banner('x') }}}\"\n",
            &context,
            &[],
        )
        .unwrap()
        .unwrap();
    assert_eq!(root.children, vec![Node::file("NOTICE", "Ada 2026 == x ==")]);
}

#[test]
fn test_trailing_comments_stay_out_of_names() {
    let root = build_tree(
        "- {mp:Title}.md  # the readme\n- plain.md  # c\n- file: {mp:Title}.txt # notes\n",
        &MemoryLibrary::new(),
        &TokenContext::new("Demo", ""),
    );

    let names: Vec<&str> = root.children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Demo.md", "plain.md", "Demo.txt"]);
}

#[test]
fn test_failing_code_token_is_located() {
    let config = makeproject::config::parse_config(
        "custom_tokens:\n  broken:\n    python: \"1 + 'a'\"\n",
    )
    .unwrap();
    let tokens = config.tokens().unwrap();
    let context = TokenContext::new("Demo", "").with_custom_tokens(&tokens);

    let err = build(
        "- a.txt\n- \"{mp:Broken}.txt\"\n",
        &MemoryLibrary::new(),
        &context,
    )
    .unwrap_err();

    match err.root_cause() {
        Error::CodeExecution { token, .. } => assert_eq!(token.as_deref(), Some("Broken")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.document(), Some("root"));
    assert_eq!(err.line(), Some(2));
}
