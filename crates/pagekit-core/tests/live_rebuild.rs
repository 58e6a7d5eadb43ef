//! Live-state behaviour of the build service over a real project tree.

use pagekit_core::compiler::SwcBackend;
use pagekit_core::dev::{resolve_request, Resolution};
use pagekit_core::{ArtifactSet, BuildService, Compiler, Mode, ModeConfig, RebuildEvent};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "public/index.html",
        "<!DOCTYPE html>\n<html>\n<head><title>app</title></head>\n<body>\n<div id=\"root\"></div>\n</body>\n</html>\n",
    );
    write(
        root,
        "src/index.tsx",
        "import styles from './App.module.scss';\n\ndocument.getElementById('root').className = styles.app;\n",
    );
    write(root, "src/App.module.scss", ".app { color: red; }\n");
    dir
}

async fn start(root: &Path) -> BuildService {
    let config = ModeConfig::new(Mode::Development, root).with_port(3111);
    let compiler = Compiler::from_config(&config, Arc::new(SwcBackend::new())).unwrap();
    BuildService::start(compiler).await.unwrap()
}

fn text(set: &ArtifactSet, name: &str) -> String {
    String::from_utf8(set.get(name).unwrap().bytes.to_vec()).unwrap()
}

fn app_token(set: &ArtifactSet) -> String {
    let bundle = text(set, "main-bundle.js");
    let prefix = "App-module__app--";
    let start = bundle.find(prefix).unwrap();
    bundle[start..start + prefix.len() + 5].to_string()
}

/// Every chunk hash matches its file: the snapshot is internally complete.
fn assert_consistent(set: &ArtifactSet) {
    for chunk in &set.chunks {
        let bytes = &set.get(&chunk.file).unwrap().bytes;
        assert_eq!(pagekit_util::hash::blake3_bytes(bytes), chunk.hash);
    }
    let mut resealed = set.clone();
    resealed.seal();
    assert_eq!(resealed.hash, set.hash);
}

#[tokio::test]
async fn test_entry_document_then_scoped_style_edit() {
    let dir = project();
    let service = start(dir.path()).await;
    let mut events = service.subscribe();

    let before = service.current_snapshot();
    match resolve_request(before.as_ref(), "/") {
        Resolution::File { name, artifact } => {
            assert_eq!(name, "index.html");
            let html = std::str::from_utf8(&artifact.bytes).unwrap();
            assert!(html.contains("/main-bundle.js"));
        }
        other => panic!("unexpected {other:?}"),
    }
    let old_token = app_token(&before);

    write(dir.path(), "src/App.module.scss", ".app { color: blue; }\n");
    let event = service
        .rebuild_now(vec![dir.path().join("src/App.module.scss")])
        .await;

    let RebuildEvent::Built { chunks, valid, .. } = &event else {
        panic!("unexpected {event:?}");
    };
    assert!(valid);
    assert_eq!(chunks, &vec!["main".to_string()]);
    assert_eq!(events.recv().await.unwrap(), event);

    let after = service.current_snapshot();
    let new_token = app_token(&after);
    assert_ne!(old_token, new_token);
    assert!(text(&after, "main-bundle.js").contains(&new_token));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_partial_snapshots() {
    let dir = project();
    let service = Arc::new(start(dir.path()).await);
    let before_hash = service.current_snapshot().hash.clone();

    write(dir.path(), "src/App.module.scss", ".app { color: green; }\n");
    let rebuild = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.rebuild_now(vec![PathBuf::from("src/App.module.scss")]).await })
    };

    let readers: Vec<_> = (0..100)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                let snapshot = service.current_snapshot();
                assert_consistent(&snapshot);
                snapshot.hash.clone()
            })
        })
        .collect();

    let event = rebuild.await.unwrap();
    let RebuildEvent::Built { hash: after_hash, .. } = event else {
        panic!("unexpected {event:?}");
    };

    for reader in readers {
        let seen = reader.await.unwrap();
        assert!(seen == before_hash || seen == after_hash);
    }
}

#[tokio::test]
async fn test_failed_rebuild_keeps_serving_previous_snapshot() {
    let dir = project();
    let service = start(dir.path()).await;
    let before = service.current_snapshot();
    let mut events = service.subscribe();

    write(dir.path(), "src/index.tsx", "import './does-not-exist';\n");
    let event = service
        .rebuild_now(vec![dir.path().join("src/index.tsx")])
        .await;

    let RebuildEvent::Failed { errors, valid, .. } = &event else {
        panic!("unexpected {event:?}");
    };
    assert!(!valid);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("TRANSFORM_UNRESOLVED_IMPORT"));

    assert_eq!(events.recv().await.unwrap(), event);
    assert!(events.try_recv().is_err());

    let after = service.current_snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(text(&after, "main-bundle.js"), text(&before, "main-bundle.js"));
}

#[test]
fn test_production_with_missing_variable_fails_before_output() {
    let dir = project();
    write(dir.path(), ".env.example", "PORT=\nAPI_KEY=\n");
    write(dir.path(), ".env", "PORT=8080\n");

    let err = ModeConfig::load(
        dir.path(),
        Mode::Production,
        std::iter::empty::<(String, String)>(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "CONFIG_MISSING_VARIABLES");
    assert!(err.to_string().contains("API_KEY"));
    assert!(!dir.path().join("dist").exists());
}
