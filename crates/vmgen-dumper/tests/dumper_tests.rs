/*
 * dumper_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for vmgen-dumper against views on disk.
 */

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vmgen_dumper::{Dumper, DumperConfig, DumperError, Locals};
use vmgen_template::TemplateValue;

/// A source tree with `tool/helpers` as engine dir and `tool/views` holding
/// the given templates.
fn source_tree(views: &[(&str, &str)]) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("tool/helpers")).unwrap();
    fs::create_dir_all(root.path().join("tool/views")).unwrap();
    fs::create_dir_all(root.path().join("build")).unwrap();
    for (name, text) in views {
        fs::write(root.path().join("tool/views").join(name), text).unwrap();
    }
    root
}

fn session(root: &Path, working_dir: &Path) -> Dumper {
    let config = DumperConfig::new("vm.inc", root)
        .with_engine_dir(root.join("tool/helpers"))
        .with_working_dir(working_dir);
    Dumper::new(config).unwrap()
}

fn locals<const N: usize>(pairs: [(&str, TemplateValue); N]) -> Locals {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[test]
fn test_partial_and_generate_end_to_end() {
    let root = source_tree(&[
        ("_helper.erb", "VALUE <%= name %>;"),
        ("main.erb", "a\nb\n#pragma RubyVM reset source\n"),
    ]);
    let mut dumper = session(root.path(), root.path());

    let text = dumper
        .render("helper", &locals([("name", TemplateValue::from("foo"))]))
        .unwrap();
    assert_eq!(text, "VALUE foo;");

    assert_eq!(
        dumper.generate_default("main").unwrap(),
        "a\nb\n#line 5 \"vm.inc\"\n"
    );
}

#[test]
fn test_template_parsed_once_and_locals_do_not_leak() {
    let root = source_tree(&[("_p.erb", "<%= x %>")]);
    let mut dumper = session(root.path(), root.path());

    let first = dumper
        .render("p", &locals([("x", TemplateValue::Integer(1))]))
        .unwrap();
    let second = dumper
        .render("p", &locals([("x", TemplateValue::Integer(2))]))
        .unwrap();
    assert_eq!((first.as_str(), second.as_str()), ("1", "2"));
    assert_eq!(dumper.cache().parse_count(), 1);

    // Editing the file does not matter once cached
    fs::write(root.path().join("tool/views/_p.erb"), "changed").unwrap();
    assert_eq!(
        dumper.render("p", &locals([("x", TemplateValue::Integer(3))])).unwrap(),
        "3"
    );

    assert!(dumper.render("p", &Locals::new()).is_err());
}

#[test]
fn test_assignments_do_not_leak_between_renders() {
    let root = source_tree(&[(
        "_counter.erb",
        "<% count = (count || 0) + step %><%= count %>",
    )]);
    let mut dumper = session(root.path(), root.path());
    let step = locals([("step", TemplateValue::Integer(5)), ("count", TemplateValue::Nil)]);

    assert_eq!(dumper.render("counter", &step).unwrap(), "5");
    assert_eq!(dumper.render("counter", &step).unwrap(), "5");
}

#[test]
fn test_structured_locals() {
    let root = source_tree(&[(
        "_insn.erb",
        "% insn.operands.each_with_index do |op, i|\n<%= i %>:<%= op.type %> <%= op.name %>\n% end\n",
    )]);
    let mut dumper = session(root.path(), root.path());
    let insn = TemplateValue::from(serde_json::json!({
        "name": "getlocal",
        "operands": [
            { "type": "lindex_t", "name": "idx" },
            { "type": "rb_num_t", "name": "level" },
        ],
    }));

    assert_eq!(
        dumper.render("insn", &locals([("insn", insn)])).unwrap(),
        "0:lindex_t idx\n1:rb_num_t level\n"
    );
}

#[test]
fn test_resolution_is_stable_across_working_dirs() {
    let root = source_tree(&[(
        "vm.inc.erb",
        "VALUE <%= name %>;\n#pragma RubyVM reset source\n",
    )]);
    // Specs under the base, given absolutely
    let spec = root.path().join("vm.inc");
    let spec = spec.to_string_lossy();
    let name = locals([("name", TemplateValue::from("x"))]);

    let mut from_root = session(root.path(), root.path());
    let mut from_build = session(root.path(), &root.path().join("build"));

    let a = from_root.generate(&spec, &name).unwrap();
    let b = from_build.generate(&spec, &name).unwrap();
    assert_eq!(a, "VALUE x;\n#line 4 \"vm.inc\"\n");
    assert_eq!(a, b);
}

#[test]
fn test_nested_relative_partial_keeps_working_dir_offset() {
    let root = source_tree(&[
        ("vm.inc.erb", "<%= render 'helper' %>\n"),
        ("_helper.erb", "VALUE x;"),
    ]);
    let spec = root.path().join("vm.inc");
    let spec = spec.to_string_lossy();

    let mut from_root = session(root.path(), root.path());
    assert_eq!(from_root.generate_default(&spec).unwrap(), "VALUE x;\n");

    // From a subdirectory of the base the nested relative spec keeps that
    // subdirectory beneath the views directory
    let mut from_build = session(root.path(), &root.path().join("build"));
    match from_build.generate_default(&spec).unwrap_err() {
        DumperError::TemplateNotFound { path, .. } => {
            assert_eq!(path, Path::new("../tool/views/build/_helper.erb"));
        }
        other => panic!("expected a missing template, got {:?}", other),
    }
}

#[test]
fn test_missing_template_does_not_poison_cache() {
    let root = source_tree(&[("_ok.erb", "ok")]);
    let mut dumper = session(root.path(), root.path());

    match dumper.render("missing", &Locals::new()).unwrap_err() {
        DumperError::TemplateNotFound { path, .. } => {
            assert_eq!(path, Path::new("tool/views/_missing.erb"));
        }
        other => panic!("expected a missing template, got {:?}", other),
    }
    let err = dumper.render("missing", &Locals::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "don't know how to generate tool/views/_missing.erb"
    );

    assert_eq!(dumper.render("ok", &Locals::new()).unwrap(), "ok");
    assert_eq!(dumper.cache().len(), 1);

    // A later retry finds the file once it exists
    fs::write(root.path().join("tool/views/_missing.erb"), "found").unwrap();
    assert_eq!(dumper.render("missing", &Locals::new()).unwrap(), "found");
}

#[test]
fn test_parse_error_names_template() {
    let root = source_tree(&[("bad.erb", "line one\n<% end %>\n")]);
    let mut dumper = session(root.path(), root.path());

    match dumper.generate_default("bad").unwrap_err() {
        DumperError::ParseError { path, text, source } => {
            assert_eq!(path, Path::new("tool/views/bad.erb"));
            assert_eq!(text, "line one\n<% end %>\n");
            let location = source.location().unwrap();
            assert_eq!((location.line, location.column), (2, 4));
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_bundled_c_expr_partial() {
    let root = source_tree(&[]);
    // Default engine dir: the crate's own views
    let config = DumperConfig::new("insns.inc", root.path()).with_working_dir(root.path());
    let mut dumper = Dumper::new(config).unwrap();

    let with_origin = locals([(
        "expr",
        TemplateValue::from(serde_json::json!({ "code": "return x;", "file": "insns.def", "line": 42 })),
    )]);
    assert_eq!(
        dumper.render("c_expr", &with_origin).unwrap(),
        "#line 42 \"insns.def\"\nreturn x;\n#pragma RubyVM reset source\n"
    );

    let bare = locals([("expr", TemplateValue::from(serde_json::json!({ "code": "0" })))]);
    let text = dumper.render("c_expr", &bare).unwrap();
    assert_eq!(text, "0\n#pragma RubyVM reset source\n");
    assert_eq!(
        dumper.replace_pragma(&text),
        "0\n#line 4 \"insns.inc\"\n"
    );
}
