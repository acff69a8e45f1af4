#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use e5r_dev::config::ToolConfig;
    use e5r_dev::devcom::factory;
    use e5r_dev::options::ParsedOptions;
    use e5r_dev::system::{Fetch, UserEnvironment};
    use e5r_dev::{CommandTable, DevCom, DevError, DevPaths, DevTool, RegistryLock};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use std::time::Duration;
    use tempfile::TempDir;

    const REGISTRY_URL: &str = "https://registry.test/dist/";

    #[derive(Debug, Clone, PartialEq)]
    struct FetchCall {
        url: String,
        path: PathBuf,
        timeout: Option<Duration>,
    }

    // Serves canned content by URL and records every request
    #[derive(Clone, Default)]
    struct FakeFetcher {
        files: Rc<RefCell<HashMap<String, String>>>,
        calls: Rc<RefCell<Vec<FetchCall>>>,
    }

    impl FakeFetcher {
        fn serve(&self, suffix: &str, content: &str) {
            self.files
                .borrow_mut()
                .insert(format!("{REGISTRY_URL}{suffix}"), content.to_string());
        }

        fn urls(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|c| c.url.clone()).collect()
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch(&self, url: &str, path: &Path, timeout: Option<Duration>) -> Result<()> {
            self.calls.borrow_mut().push(FetchCall {
                url: url.to_string(),
                path: path.to_path_buf(),
                timeout,
            });

            let Some(content) = self.files.borrow().get(url).cloned() else {
                bail!("404 for {url}");
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeEnvironment {
        prepended: Rc<RefCell<Vec<PathBuf>>>,
    }

    impl UserEnvironment for FakeEnvironment {
        fn get(&self, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _name: &str, _value: &str) -> Result<()> {
            Ok(())
        }

        fn prepend_path(&self, dir: &Path) -> Result<()> {
            self.prepended.borrow_mut().push(dir.to_path_buf());
            Ok(())
        }
    }

    struct Fixture {
        _home: TempDir,
        tool: DevTool,
        fetcher: FakeFetcher,
        environment: FakeEnvironment,
    }

    fn create_fixture() -> Result<Fixture> {
        let home = TempDir::new()?;
        let paths = DevPaths::new(home.path().join(".dev"));
        let fetcher = FakeFetcher::default();
        let environment = FakeEnvironment::default();

        let mut tool = DevTool::new(
            paths,
            Box::new(fetcher.clone()),
            Box::new(environment.clone()),
        );
        tool.save_config(&ToolConfig {
            registry_url: REGISTRY_URL.to_string(),
            fetch_timeout: 30,
        })?;

        Ok(Fixture {
            _home: home,
            tool,
            fetcher,
            environment,
        })
    }

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn dev_error(err: &anyhow::Error) -> Option<&DevError> {
        err.chain().find_map(|cause| cause.downcast_ref::<DevError>())
    }

    #[test]
    fn test_dispatch_without_devcom() -> Result<()> {
        let mut fixture = create_fixture()?;
        assert_eq!(fixture.tool.dispatch(&[])?, 1);
        Ok(())
    }

    #[test]
    fn test_dispatch_unknown_devcom() -> Result<()> {
        let mut fixture = create_fixture()?;

        let err = fixture.tool.dispatch(&argv(&["frobnicate"])).unwrap_err();
        assert!(matches!(
            dev_error(&err),
            Some(DevError::ResourceNotFound { uri, .. }) if uri == "cmd://frobnicate"
        ));

        let err = fixture.tool.dispatch(&argv(&["../wget"])).unwrap_err();
        assert!(matches!(dev_error(&err), Some(DevError::InvalidUri(_))));

        Ok(())
    }

    #[test]
    fn test_dispatch_reserved_word() -> Result<()> {
        let mut fixture = create_fixture()?;

        let err = fixture
            .tool
            .dispatch(&argv(&["wget", "https://x.test/a", "args"]))
            .unwrap_err();
        assert!(matches!(dev_error(&err), Some(DevError::ReservedWord(_))));
        assert!(fixture.fetcher.urls().is_empty());

        Ok(())
    }

    #[test]
    fn test_wget_usage_sets_exit_code() -> Result<()> {
        let mut fixture = create_fixture()?;

        let code = fixture.tool.dispatch(&argv(&["wget", "https://x.test/a"]))?;
        assert_eq!(code, 1);
        assert!(fixture.fetcher.urls().is_empty());

        Ok(())
    }

    #[test]
    fn test_wget_downloads_with_timeout() -> Result<()> {
        let mut fixture = create_fixture()?;
        fixture.fetcher.serve("file.txt", "hello");

        let target = fixture.tool.paths.root.join("downloads").join("file.txt");
        let url = format!("{REGISTRY_URL}file.txt");
        let code = fixture.tool.dispatch(&argv(&[
            "wget",
            &url,
            &target.to_string_lossy(),
            "--timeout",
            "5",
            "-quiet",
        ]))?;

        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&target)?, "hello");
        assert_eq!(
            fixture.fetcher.calls.borrow().as_slice(),
            [FetchCall {
                url,
                path: target,
                timeout: Some(Duration::from_secs(5)),
            }]
        );

        Ok(())
    }

    // -quiet is an option, not one of the two positionals
    #[test]
    fn test_wget_quiet_before_positionals() -> Result<()> {
        let mut fixture = create_fixture()?;
        fixture.fetcher.serve("notes.txt", "notes");

        let target = fixture.tool.paths.root.join("notes.txt");
        let url = format!("{REGISTRY_URL}notes.txt");
        let code = fixture.tool.dispatch(&argv(&[
            "wget",
            "-quiet",
            &url,
            &target.to_string_lossy(),
        ]))?;

        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&target)?, "notes");
        assert_eq!(fixture.fetcher.calls.borrow()[0].timeout, None);

        Ok(())
    }

    // Failed download keeps the existing target and aborts the devcom
    #[test]
    fn test_wget_failure_keeps_target() -> Result<()> {
        let mut fixture = create_fixture()?;

        let target = fixture.tool.paths.root.join("notes.txt");
        fs::create_dir_all(&fixture.tool.paths.root)?;
        fs::write(&target, "mine")?;

        let url = format!("{REGISTRY_URL}missing.txt");
        let result = fixture.tool.dispatch(&argv(&[
            "wget",
            "-quiet",
            &url,
            &target.to_string_lossy(),
        ]));

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&target)?, "mine");

        Ok(())
    }

    #[test]
    fn test_wget_rejects_invalid_url() -> Result<()> {
        let mut fixture = create_fixture()?;

        let err = fixture
            .tool
            .dispatch(&argv(&["wget", "not-a-url", "out.txt"]))
            .unwrap_err();
        assert!(matches!(dev_error(&err), Some(DevError::InvalidInput(_))));

        Ok(())
    }

    // Non-built-in devcoms are fetched through their uri suffix on first use
    #[test]
    fn test_registry_devcom_is_installed_on_demand() -> Result<()> {
        let mut fixture = create_fixture()?;

        let err = fixture.tool.dispatch(&argv(&["registry"])).unwrap_err();
        assert!(matches!(
            dev_error(&err),
            Some(DevError::ResourceNotFound { uri, .. }) if uri == "cmd://registry"
        ));
        assert_eq!(
            fixture.fetcher.urls(),
            [format!("{REGISTRY_URL}lib/cmd/registry.js")]
        );

        fixture.fetcher.serve("lib/cmd/registry.js", "// registry");
        fixture.fetcher.serve("registry.lock.json", r#"["wget.js", "dev.sh"]"#);

        let code = fixture.tool.dispatch(&argv(&["registry", "list"]))?;
        assert_eq!(code, 0);
        assert!(fixture.tool.paths.cmd.join("registry.js").is_file());
        assert_eq!(
            RegistryLock::load(fixture.tool.paths.registry_lock())?.entries,
            ["wget.js", "dev.sh"]
        );

        Ok(())
    }

    #[test]
    fn test_registry_lock_missing() -> Result<()> {
        let mut fixture = create_fixture()?;

        let err = fixture.tool.registry_lock().unwrap_err();
        assert!(matches!(dev_error(&err), Some(DevError::RegistryMissing(_))));

        Ok(())
    }

    #[test]
    fn test_require_uses_local_resource_first() -> Result<()> {
        let mut fixture = create_fixture()?;

        let doc = fixture.tool.paths.doc.join("readme.txt");
        fs::create_dir_all(&fixture.tool.paths.doc)?;
        fs::write(&doc, "local")?;

        let resource = fixture.tool.require("doc://readme")?;
        assert_eq!(resource.absolute_path, doc);
        assert!(fixture.fetcher.urls().is_empty());

        fixture.fetcher.serve("lib/shell.js", "remote");
        let lib = fixture.tool.require("lib://shell")?;
        assert_eq!(fs::read_to_string(lib.absolute_path)?, "remote");
        assert_eq!(fixture.fetcher.urls(), [format!("{REGISTRY_URL}lib/shell.js")]);

        let err = fixture.tool.require("ftp://nope").unwrap_err();
        assert!(matches!(dev_error(&err), Some(DevError::InvalidUri(_))));

        Ok(())
    }

    #[test]
    fn test_setup_installs_layout() -> Result<()> {
        let mut fixture = create_fixture()?;
        fixture.fetcher.serve("registry.lock.json", r#"["registry.js", "wget.js", "dev.sh", "dev.cmd"]"#);
        fixture.fetcher.serve("lib/cmd/registry.js", "// registry");
        fixture.fetcher.serve("dev.sh", "#!/bin/sh\n");
        fixture.fetcher.serve("dev.cmd", "@echo off\r\n");

        let code = fixture.tool.dispatch(&argv(&["setup"]))?;
        assert_eq!(code, 0);

        let paths = fixture.tool.paths.clone();
        for dir in paths.directories() {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }
        assert!(paths.registry_lock().is_file());
        assert!(paths.bin.join("dev.sh").is_file());
        assert!(paths.bin.join("dev.cmd").is_file());
        assert_eq!(*fixture.environment.prepended.borrow(), [paths.bin.clone()]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(paths.bin.join("dev.sh"))?.permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        // Configured timeout is used when a devcom gives none
        assert!(fixture
            .fetcher
            .calls
            .borrow()
            .iter()
            .all(|call| call.timeout == Some(Duration::from_secs(30))));

        Ok(())
    }

    #[test]
    fn test_config_devcom_persists_value() -> Result<()> {
        let mut fixture = create_fixture()?;

        let code = fixture.tool.dispatch(&argv(&["config", "fetch_timeout", "90"]))?;
        assert_eq!(code, 0);
        assert_eq!(fixture.tool.config()?.fetch_timeout, 90);

        let saved = fs::read_to_string(fixture.tool.paths.config_file())?;
        assert!(saved.contains("\"fetch_timeout\": 90"));

        let err = fixture
            .tool
            .dispatch(&argv(&["config", "unknown"]))
            .unwrap_err();
        assert!(matches!(dev_error(&err), Some(DevError::InvalidInput(_))));

        Ok(())
    }

    #[test]
    fn test_registry_build_from_sources() -> Result<()> {
        let mut fixture = create_fixture()?;
        fixture.fetcher.serve("lib/cmd/registry.js", "// registry");

        let source = TempDir::new()?;
        let devcom_dir = source.path().join("devcom");
        fs::create_dir_all(&devcom_dir)?;
        fs::write(devcom_dir.join("wget.js"), "")?;
        fs::write(devcom_dir.join("setup.js"), "")?;
        fs::write(devcom_dir.join("dev.ps1"), "")?;

        let code = fixture.tool.dispatch(&argv(&[
            "registry",
            "build",
            &source.path().to_string_lossy(),
        ]))?;
        assert_eq!(code, 0);

        let lock = RegistryLock::load(fixture.tool.paths.registry_lock())?;
        assert_eq!(lock.entries, ["dev.ps1", "setup.js", "wget.js"]);

        let code = fixture.tool.dispatch(&argv(&["registry", "frob"]))?;
        assert_eq!(code, 1);

        Ok(())
    }

    #[test]
    fn test_registry_build_with_prefix_and_output() -> Result<()> {
        let mut fixture = create_fixture()?;
        fixture.fetcher.serve("lib/cmd/registry.js", "// registry");

        let source = TempDir::new()?;
        let commands = source.path().join("commands");
        fs::create_dir_all(commands.join("bin"))?;
        fs::write(commands.join("wget.js"), "")?;
        fs::write(commands.join("bin").join("dev.sh"), "")?;
        fs::create_dir_all(source.path().join("devcom"))?;
        fs::write(source.path().join("devcom").join("ignored.js"), "")?;

        let output = source.path().join("out").join("registry.lock.json");
        let code = fixture.tool.dispatch(&argv(&[
            "registry",
            "build",
            &source.path().to_string_lossy(),
            "--prefix",
            "commands",
            &format!("--output={}", output.display()),
        ]))?;
        assert_eq!(code, 0);

        assert_eq!(RegistryLock::load(&output)?.entries, ["bin/dev.sh", "wget.js"]);
        assert!(!fixture.tool.paths.registry_lock().exists());

        Ok(())
    }

    // Reports the number of positional arguments as its exit status
    #[derive(Default)]
    struct CountArgs;

    impl DevCom for CountArgs {
        fn name(&self) -> &'static str {
            "count-args"
        }

        fn short_doc(&self) -> &'static str {
            "Count positional arguments"
        }

        fn run(&self, tool: &mut DevTool, options: &ParsedOptions) -> Result<()> {
            tool.exit_code = i32::try_from(options.args().len())?;
            Ok(())
        }
    }

    #[test]
    fn test_custom_command_table() -> Result<()> {
        let fixture = create_fixture()?;
        let mut table = CommandTable::empty();
        table.register(factory::<CountArgs>);
        let mut tool = fixture.tool.with_commands(table);

        assert_eq!(tool.dispatch(&argv(&["count-args", "a", "-f", "b"]))?, 2);
        assert_eq!(tool.dispatch(&argv(&["count-args"]))?, 0);

        // Built-ins are gone from this table
        let err = tool.dispatch(&argv(&["wget"])).unwrap_err();
        assert!(matches!(dev_error(&err), Some(DevError::ResourceNotFound { .. })));

        // Help looks up the devcom documentation, and a missing doc is not an error
        assert_eq!(tool.dispatch(&argv(&["count-args", "-help"]))?, 0);
        fixture.fetcher.serve("doc/count-args.txt", "Counts things.");
        assert_eq!(tool.dispatch(&argv(&["count-args", "-HELP"]))?, 0);
        assert!(tool.paths.doc.join("count-args.txt").is_file());
        assert_eq!(
            fixture.fetcher.urls(),
            [
                format!("{REGISTRY_URL}doc/count-args.txt"),
                format!("{REGISTRY_URL}doc/count-args.txt")
            ]
        );

        Ok(())
    }
}
