//! End-to-end tests driving `Preprocessor::process` with the default
//! delimiters.

use std::fs;

use preproc::{CollectingSink, Config, ErrorType, Preprocessor, WarningCategory, WarningMode};

fn preprocessor(config: Config) -> (Preprocessor, CollectingSink) {
    let sink = CollectingSink::new();
    let pre = Preprocessor::new(config).unwrap().with_sink(sink.clone());
    (pre, sink)
}

fn run(text: &str) -> String {
    let (mut pre, _) = preprocessor(Config::default());
    pre.process("my_file", text).unwrap()
}

fn run_err(text: &str) -> preproc::PreprocError {
    let (mut pre, _) = preprocessor(Config::default());
    pre.process("my_file", text).unwrap_err()
}

fn check(cases: &[(&str, &str)]) {
    for (input, expected) in cases {
        assert_eq!(run(input), *expected, "input: {:?}", input);
    }
}

// ============================================================================
// CORE PROPERTIES
// ============================================================================

#[test]
fn text_without_directives_is_unchanged() {
    assert_eq!(run(""), "");
    assert_eq!(run("just text\nwith { and % and }\n"), "just text\nwith { and % and }\n");
}

#[test]
fn block_pairs_must_balance() {
    let balanced = "{% block %}a{% block %}b{% endblock %}c{% endblock %}";
    assert_eq!(run(balanced), "abc");
    let missing_close = "{% block %}a{% block %}b{% endblock %}c";
    assert_eq!(run_err(missing_close).error_type(), ErrorType::Syntax);
    assert_eq!(run_err("a{% b").error_type(), ErrorType::Syntax);
}

#[test]
fn repeat() {
    assert_eq!(run("{% repeat 3 %}a{% endrepeat %}"), "aaa");
    assert_eq!(run("{% repeat 5 %}yo{% endrepeat %}"), "yoyoyoyoyo");
    assert_eq!(run_err("{% repeat 0 %}a{% endrepeat %}").error_type(), ErrorType::Argument);
    assert_eq!(run_err("{% repeat -1 %}a{% endrepeat %}").error_type(), ErrorType::Argument);
    assert_eq!(
        run_err("{% repeat 9223372036854775807 %}abc{% endrepeat %}").error_type(),
        ErrorType::Argument
    );
}

#[test]
fn for_loops() {
    check(&[
        ("{% for x in range(3) %}{% x %},{% endfor %}", "0,1,2,"),
        ("{% for x in range(1, 7, 2) %}{% x %}{% endfor %}", "135"),
        ("{% for x in range(3, 0, -1) %}{% x %}{% endfor %}", "321"),
        ("{% for w in a \"b c\" d %}[{% w %}]{% endfor %}", "[a][b c][d]"),
        ("{% for x in range(2) %}{% endfor %}{% x %}", "1"),
    ]);
    assert_eq!(
        run_err("{% for x in range(1, 2, 0) %}{% endfor %}").error_type(),
        ErrorType::Argument
    );
    assert_eq!(run_err("{% for 1x in a %}{% endfor %}").error_type(), ErrorType::Syntax);
}

#[test]
fn if_elif_else() {
    check(&[
        ("{% def foo %}{% if def foo %}A{% else %}B{% endif %}", "A"),
        ("{% def foo %}{% undef foo %}{% if def foo %}A{% else %}B{% endif %}", "B"),
        ("{% if 1 == 2 %}A{% elif ndef x %}B{% else %}C{% endif %}", "B"),
        ("{% def x %}{% if 1 == 2 %}A{% elif ndef x %}B{% else %}C{% endif %}", "C"),
        ("{% if true %}{% if false %}a{% else %}b{% endif %}{% else %}c{% endif %}", "b"),
        ("{% def v 3 %}{% if {% v %} == 3 and not false %}yes{% endif %}", "yes"),
    ]);
    assert_eq!(run_err("{% if (true %}a{% endif %}").error_type(), ErrorType::Condition);
}

#[test]
fn recursion_is_bounded() {
    let err = run_err("{% def loop {% begin %}loop{% end %} %}{% loop %}");
    assert_eq!(err.error_type(), ErrorType::RecursionLimit);
    assert!(err.trace().entries.len() > 20);

    let config = Config {
        max_recursion_depth: 3,
        ..Config::default()
    };
    let (mut pre, _) = preprocessor(config);
    let err = pre
        .process("t", "{% def loop {% begin %}loop{% end %} %}{% loop %}")
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::RecursionLimit);
}

#[test]
fn block_does_not_roll_back_definitions() {
    assert_eq!(run("{% block %}{% def x 1 %}{% endblock %}{% x %}"), "1");
    assert_eq!(
        run("text{% void %}{% def name john %}hello this is a comment{% endvoid %}\n{% name %}"),
        "text\njohn"
    );
}

// ============================================================================
// COMMANDS
// ============================================================================

#[test]
fn position_commands() {
    check(&[
        ("{% file %}", "my_file"),
        ("{% line %}\n\n\n{% line %}", "1\n\n\n4"),
        ("h \n\n{% block %}{% line %}in sub{% endblock %}", "h \n\n3in sub"),
        (
            "{% void %}{% def a \"booyouhou\n\" %}\n\n\n\n{% endvoid %}{% line %}{% a %}{% a %}{% line %}",
            "6booyouhou\nbooyouhou\n6",
        ),
        (
            "{% line %}{% repeat 5 %}\t\n{% endrepeat %}µ{% line %}",
            "1\t\n\t\n\t\n\t\n\t\nµ2",
        ),
    ]);
}

#[test]
fn definitions() {
    check(&[
        ("{% def nom jean %}\nbonjour je suis {% nom %}", "\nbonjour je suis jean"),
        ("{% def nom\" jean\" %}\nbonjour je suis {% nom %}", "\nbonjour je suis  jean"),
        (
            "{% def nom\" \"\\\"jean\" %}\nbonjour je suis {% nom %}",
            "\nbonjour je suis  \"\"jean",
        ),
        ("{% def nom jean %}{% def prenom nom %}\nbonjour je suis {% prenom %}", "\nbonjour je suis nom"),
        (
            "{% def nom jean %}{% def prenom {% nom %} %}\nbonjour je suis {% prenom %}",
            "\nbonjour je suis jean",
        ),
        ("{% def add(a,b,c) (a+b+2c) %}hello{% add 1 2 3 %}", "hello(1+2+23)"),
        ("{% def add(pha,alpha,lpha) (pha,alpha)lpha %}hello{% add 1 2 3 %}", "hello(1,2)3"),
    ]);
    assert_eq!(run_err("{% def add(a,b) a+b %}{% add 1 %}").error_type(), ErrorType::Argument);
    assert_eq!(run_err("{% def f(a,a) a %}").error_type(), ErrorType::Argument);
    assert_eq!(run_err("{% def x 1 %}{% undef x %}{% x %}").error_type(), ErrorType::UnknownDirective);
}

#[test]
fn deflist() {
    check(&[
        ("{% deflist l a \"b c\" d %}{% l 1 %}|{% l -1 %}|{% l %}", "b c|d|a \"b c\" d"),
        ("{% deflist l x y %}{% l -2 %}", "x"),
    ]);
    assert_eq!(run_err("{% deflist l x y %}{% l 2 %}").error_type(), ErrorType::Argument);
    assert_eq!(run_err("{% deflist l x y %}{% l one %}").error_type(), ErrorType::Argument);
}

#[test]
fn begin_end_and_call() {
    check(&[
        ("{% begin %}", "{% "),
        ("{% end %}", " %}"),
        ("{% begin 12 %}", "{% begin 11 %}"),
        ("{% def hello {% begin 1 %} %}{% hello %}", "{% "),
        ("{% def foo bar %}{% def hello {% begin %}foo{% end %} %}{% hello %}", "bar"),
        ("{% def foo bar %}{% call   foo %}", "{% foo %}"),
    ]);
}

#[test]
fn case_commands() {
    check(&[
        ("{% upper hello %}", "HELLO"),
        ("{% lower \"HeLLo World\" %}", "hello world"),
        ("{% capitalize wORLD %}", "World"),
        ("a{% block %}{% upper %}b{% endblock %}c", "aBc"),
        ("{% capitalize %}hELLO", "Hello"),
    ]);
}

#[test]
fn version() {
    assert_eq!(run("{% version %}"), preproc::VERSION);
}

// ============================================================================
// FINAL ACTIONS
// ============================================================================

#[test]
fn strips() {
    check(&[
        ("{% strip_empty_lines %}\n\t\nhello\n  \n  \nhi\n", "\nhello\nhi\n"),
        (
            "{% strip_trailing_whitespace %}hello \n my name is johnd\t\t \nc\n",
            "hello\n my name is johnd\nc\n",
        ),
        (
            "{% strip_leading_whitespace %}hello \n  my name\n\t \t is johnc\n",
            "hello \nmy name\nis johnc\n",
        ),
        ("{% fix_last_line %}", ""),
        ("{% fix_last_line %}hello", "hello\n"),
        ("{% fix_last_line %}hello\n\n\n", "hello\n"),
        ("{% fix_first_line %}", ""),
        ("{% fix_first_line %}\nhello", "hello"),
        ("{% fix_first_line %}  \n\t\x0c\nhello\n\n\n", "hello\n\n\n"),
    ]);
}

#[test]
fn replace() {
    check(&[
        ("foofoobjf{% replace foo bar %}oofbifooj", "barbarbjbarfbibarj"),
        ("foo{% block %}{% replace foo bar %}foo yfoo{% endblock %}foo", "foobar ybarfoo"),
        ("afoo{% replace foo bar %}{% replace aba yo %}fooabr", "yorbarabr"),
        ("afoo{% replace --ignore-case foo bar %}FoOfOo FOO", "abarbarbar bar"),
        ("{% replace -w foo bar %}foo(afoo1foo+foo foo", "bar(afoo1bar+bar bar"),
        ("{% replace -w \"foo\" bar %}foo(afoo1foo+foo foo", "bar(afoo1bar+bar bar"),
        (r#"{% replace -r "([a-z]+)" "low(\\1)" %}hello hio"#, "low(hello) low(hio)"),
        ("{% replace -c 2 foo bar %}foo foo foo foo", "bar bar foo foo"),
        ("{% replace a b \"a cat\" %} a cat", "b cat a cat"),
    ]);
    assert_eq!(run_err("{% replace -r ( x %}").error_type(), ErrorType::Argument);
    assert_eq!(run_err("{% replace --nope a b %}").error_type(), ErrorType::Argument);
}

// ============================================================================
// BLOCKS
// ============================================================================

#[test]
fn simple_blocks() {
    check(&[
        ("{% verbatim %}{% hello %}{% endverbatim %}", "{% hello %}"),
        (
            "{% verbatim %}a{% verbatim %}b{% endverbatim %}c{% endverbatim %}d",
            "a{% verbatim %}b{% endverbatim %}cd",
        ),
        ("a{% void %}{% upper %}b{% endvoid %}c", "ac"),
        ("{% label foo %}lala{% atlabel foo %}bar{% endatlabel %}yoyo{% label foo %}oups", "barlalayoyobaroups"),
    ]);
}

#[test]
fn atlabel_without_label_warns_once() {
    let (mut pre, sink) = preprocessor(Config::default());
    let out = pre
        .process("doc", "{% atlabel nowhere %}text{% endatlabel %}done")
        .unwrap();
    assert_eq!(out, "done");
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.warnings()[0].category, WarningCategory::NoMatchingLabel);
}

#[test]
fn duplicate_atlabel_is_an_error() {
    let err = run_err("{% atlabel a %}x{% endatlabel %}{% atlabel a %}y{% endatlabel %}");
    assert_eq!(err.error_type(), ErrorType::DuplicateLabel);
}

#[test]
fn labels_repeated_by_loops_all_receive_content() {
    assert_eq!(
        run("{% repeat 3 %}[{% label l %}]{% endrepeat %}{% atlabel l %}x{% endatlabel %}"),
        "[x][x][x]"
    );
}

#[test]
fn paste_before_cut_resolves_at_the_end() {
    check(&[
        (
            "{% paste %}|{% cut %}A{% endcut %}{% paste %}|{% cut %}B{% endcut %}{% paste %}",
            "B|A|B",
        ),
        ("{% paste -v c %}{% cut c %}{% begin %}{% endcut %}", "{% begin %}"),
        ("{% def x 1 %}{% cut %}{% x %}{% endcut %}{% def x 2 %}{% paste %}", "2"),
        ("{% def x 1 %}{% cut -p %}{% x %}{% endcut %}{% def x 2 %}{% paste %}", "1"),
    ]);
}

#[test]
fn paste_inside_atlabel_resolves_before_placement() {
    let (mut pre, sink) = preprocessor(Config::default());
    let out = pre
        .process("doc", "[{% label L %}]{% atlabel L %}<{% paste %}>{% endatlabel %}{% cut %}X{% endcut %}")
        .unwrap();
    assert_eq!(out, "[<X>]");
    assert!(sink.is_empty());

    let out = pre
        .process("doc", "[{% label L %}]{% atlabel L %}<{% paste none %}>{% endatlabel %}")
        .unwrap();
    assert_eq!(out, "[<>]");
    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].category, WarningCategory::UndefinedClipboard);
}

#[test]
fn private_use_text_resembling_markers_is_kept() {
    let text = "a\u{E000}0\u{E002}b\u{E001}0\u{E002}c";
    assert_eq!(run(text), text);
    let with_label = format!("{text}{{% label L %}}{{% atlabel L %}}x{{% endatlabel %}}");
    assert_eq!(run(&with_label), format!("{text}x"));
}

#[test]
fn paste_of_a_clipboard_never_cut_warns() {
    let (mut pre, sink) = preprocessor(Config::default());
    assert_eq!(pre.process("doc", "a{% paste nothing %}b").unwrap(), "ab");
    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].category, WarningCategory::UndefinedClipboard);
    assert_eq!(warnings[0].trace.innermost().unwrap().position.column, 2);
}

// ============================================================================
// INCLUDE
// ============================================================================

#[test]
fn include() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.out");
    let config = Config {
        include_paths: vec![dir.path().to_path_buf()],
        ..Config::default()
    };
    let cases = [
        ("hello", "bonjour:{% include test.out %}:guten tag", "bonjour:hello:guten tag"),
        ("{% def a b %}", "bonjour:{% include test.out %}:{% a %}", "bonjour::b"),
        (
            "{% def a b %}{% c %}",
            "bonjour{% def c d %}:{% include test.out %}:{% a %}",
            "bonjour:d:b",
        ),
        (
            "{% def a b %}{% c %}",
            "bonjour{% def c d %}:{% include -v test.out %}:{% a %}",
            "bonjour:{% def a b %}{% c %}:b",
        ),
    ];
    for (content, input, expected) in cases {
        fs::write(&path, content).unwrap();
        let (mut pre, _) = preprocessor(config.clone());
        assert_eq!(pre.process("main", input).unwrap(), expected);
    }
}

#[test]
fn errors_in_included_files_point_into_them() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.txt");
    fs::write(&path, "fine\n  {% nope %}").unwrap();
    let config = Config {
        include_paths: vec![dir.path().to_path_buf()],
        ..Config::default()
    };
    let (mut pre, _) = preprocessor(config);
    let err = pre.process("main", "top\n{% include broken.txt %}").unwrap_err();
    assert_eq!(err.error_type(), ErrorType::UnknownDirective);
    let trace = err.trace();
    let innermost = trace.innermost().unwrap();
    assert_eq!(innermost.source, path.display().to_string());
    assert_eq!((innermost.position.line, innermost.position.column), (2, 3));
    assert!(trace.entries.iter().any(|e| e.description == "in included file"));
    assert!(trace.entries.iter().any(|e| e.source == "main" && e.position.line == 2));
}

// ============================================================================
// WARNINGS AND ERRORS
// ============================================================================

#[test]
fn warning_modes() {
    let (mut pre, sink) = preprocessor(Config::default());
    assert_eq!(pre.process("doc", "a{% warning careful %}b").unwrap(), "ab");
    assert_eq!(sink.warnings()[0].category, WarningCategory::User);
    assert_eq!(sink.warnings()[0].message, "raised by warning command\ncareful");

    let hidden = Config {
        warning_mode: WarningMode::Hide,
        ..Config::default()
    };
    let (mut pre, sink) = preprocessor(hidden);
    pre.process("doc", "{% warning careful %}{% version extra %}").unwrap();
    assert!(sink.is_empty());

    let escalated = Config {
        warning_mode: WarningMode::Error,
        ..Config::default()
    };
    let (mut pre, _) = preprocessor(escalated.clone());
    let err = pre.process("doc", "{% version extra %}").unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Escalated);

    let silenced = Config {
        silence: vec![WarningCategory::ExtraArguments],
        ..escalated
    };
    let (mut pre, sink) = preprocessor(silenced);
    assert_eq!(pre.process("doc", "{% file extra %}").unwrap(), "doc");
    assert!(sink.is_empty());
}

#[test]
fn error_command_reports_its_location() {
    let err = run_err("one\ntwo {% block %}\n{% error boom %}{% endblock %}");
    assert_eq!(err.error_type(), ErrorType::Raised);
    assert_eq!(err.to_string(), "raised by error command\nboom");
    let trace = err.trace();
    assert_eq!(trace.innermost().unwrap().position.line, 3);
    assert!(trace.entries.len() >= 3);
}

#[test]
fn seeded_defines_are_commands() {
    let config = Config {
        defines: vec!["name=world".to_string(), "flag".to_string()],
        ..Config::default()
    };
    let (mut pre, _) = preprocessor(config);
    let out = pre
        .process("doc", "{% name %}{% if def flag %}!{% endif %}")
        .unwrap();
    assert_eq!(out, "world!");
}

#[test]
fn custom_delimiters() {
    let config = Config {
        token_begin: "<<".to_string(),
        token_end: ">>".to_string(),
        ..Config::default()
    };
    let (mut pre, _) = preprocessor(config);
    let out = pre
        .process("doc", "<<def x 1>>{% x %} <<x>> \\<<x>>")
        .unwrap();
    assert_eq!(out, "{% x %} 1 <<x>>");
}
