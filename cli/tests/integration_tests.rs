#[cfg(test)]
mod cli_integration_tests {
    use std::fs;

    use assert_cmd::Command;
    use bb::{compile, unit_name, CompileOptions};
    use pretty_assertions::assert_eq;

    macro_rules! assert_command {
        ($command:expr) => {{
            let mut args: Vec<&str> = $command.split_whitespace().collect();

            let command_name = args.remove(0);

            let mut cmd = Command::cargo_bin(command_name).unwrap();

            for arg in args {
                cmd.arg(arg);
            }

            let assert = cmd.env_remove("BB_LOG").assert();
            assert
        }};
    }

    fn stdout(assert: assert_cmd::assert::Assert) -> String {
        String::from_utf8(assert.get_output().stdout.clone()).unwrap()
    }

    fn stderr(assert: assert_cmd::assert::Assert) -> String {
        String::from_utf8(assert.get_output().stderr.clone()).unwrap()
    }

    #[test]
    fn no_args() {
        let assert = assert_command!("bb").failure();

        let stderr = stderr(assert);

        assert!(stderr.starts_with("Compile bb templates in to Rust render units"));
        assert!(stderr.contains("Usage: bb [OPTIONS] <COMMAND>"));

        for command in ["tokens", "ast", "check", "compile"] {
            assert!(stderr.contains(&format!("  {command} ")), "{command} missing");
        }
    }

    #[test]
    fn invalid_subcommand() {
        let assert = assert_command!("bb foobar").failure();

        assert!(stderr(assert).starts_with("error: unrecognized subcommand 'foobar'"));
    }

    #[test]
    fn tokens() {
        let assert = assert_command!("bb tokens ../templates/valid/simple_section.bb").success();

        let tokens: Vec<serde_json::Value> = serde_json::from_str(&stdout(assert)).unwrap();

        let kinds: Vec<&str> = tokens
            .iter()
            .map(|token| token["kind"].as_str().unwrap())
            .collect();

        assert_eq!(
            vec!["Literal", "Statement", "Literal", "Statement", "Statement"],
            kinds
        );
        assert_eq!("This is a section test ", tokens[0]["text"]);
    }

    #[test]
    fn ast_has_inferred_types() {
        let assert = assert_command!("bb ast ../templates/valid/loops.bb").success();

        let ast: serde_json::Value = serde_json::from_str(&stdout(assert)).unwrap();

        let cell = &ast["root"]["sections"][0];

        assert_eq!(serde_json::json!(["cell"]), cell["name"]);
        assert_eq!(serde_json::json!({ "Inferred": "i32" }), cell["params"][0]["ty"]);
    }

    #[test]
    fn check_valid_template() {
        let assert = assert_command!("bb check ../templates/valid/nested_sections.bb").success();

        assert_eq!("", stdout(assert));
    }

    #[test]
    fn check_invalid_template() {
        let assert = assert_command!("bb check ../templates/invalid/ambiguous_type.bb")
            .failure()
            .code(1);

        let stderr = stderr(assert);

        assert!(stderr.starts_with(
            "error[TypeError]: The type of 'x' is ambiguous, usage sites disagree: &str, i32"
        ));
        assert!(stderr.contains("../templates/invalid/ambiguous_type.bb:1:1"));
    }

    #[test]
    fn check_missing_file() {
        let assert = assert_command!("bb check ../templates/valid/missing.bb").failure();

        assert!(stderr(assert).starts_with("Unable to read ../templates/valid/missing.bb"));
    }

    #[test]
    fn compile_to_stdout() {
        let path = "../templates/valid/section_with_params.bb";

        let cmd = format!("bb compile {path}");
        let assert = assert_command!(cmd).success();

        let source = fs::read_to_string(path).unwrap();
        let expected = compile(
            &source,
            &CompileOptions::default()
                .with_name(unit_name(path.as_ref()))
                .with_file_name(path),
        )
        .unwrap();

        assert_eq!(expected, stdout(assert));
    }

    #[test]
    fn compile_with_name_to_file() {
        let output = std::env::temp_dir().join(format!("bb-cli-{}.rs", std::process::id()));

        let cmd = format!(
            "bb compile ../templates/valid/simple_section.bb --name custom --output {}",
            output.display()
        );

        let assert = assert_command!(cmd).success();

        assert_eq!("", stdout(assert));

        let generated = fs::read_to_string(&output).unwrap();

        assert!(generated.contains("pub mod custom {"));

        fs::remove_file(output).unwrap();
    }

    #[test]
    fn verbose_logs_stages() {
        let assert =
            assert_command!("bb --verbose check ../templates/valid/simple_section.bb").success();

        assert!(stderr(assert).contains("tokenized template"));
    }
}
