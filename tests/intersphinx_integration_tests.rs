//! Integration tests for fetching, caching and resolving intersphinx references.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use intersphinx_ultra::{
    load_mappings_at, read_inline, resolve_pending_references, BuildEnvironment,
    DocumentedObject, IntersphinxConfig, InventoryFile, MappingEntry, Node, TextElement,
    WarningKind,
};

const DAY: i64 = 86_400;

fn object(name: &str, display_name: &str, objtype: &str, docname: &str, anchor: &str) -> DocumentedObject {
    DocumentedObject {
        name: name.to_string(),
        display_name: display_name.to_string(),
        objtype: objtype.to_string(),
        docname: docname.to_string(),
        anchor: anchor.to_string(),
        priority: 1,
    }
}

fn python_inventory() -> Vec<u8> {
    let mut objects = BTreeMap::new();
    objects.insert(
        "py".to_string(),
        vec![
            object("str", "str", "class", "library/stdtypes", "str"),
            object("os.path.join", "os.path.join", "function", "library/os.path", "os.path.join"),
        ],
    );
    objects.insert(
        "std".to_string(),
        vec![
            object("intro", "Introduction", "label", "intro", "intro"),
            object("tutorial/index", "Tutorial", "doc", "tutorial/index", ""),
        ],
    );
    InventoryFile::dump_to_vec("Python", "3.12", &objects, |doc| format!("{}.html", doc)).unwrap()
}

/// Serves `routes` (path -> response) over HTTP on a loopback port and
/// counts the requests it answers.
fn serve(routes: Vec<(&'static str, Vec<u8>)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            counter.fetch_add(1, Ordering::SeqCst);

            let request = String::from_utf8_lossy(&request);
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
            let response = routes
                .iter()
                .find(|(route, _)| *route == path)
                .map(|(_, body)| body.clone())
                .unwrap_or_else(|| {
                    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_vec()
                });
            let _ = stream.write_all(&response);
        }
    });

    (base, hits)
}

fn ok_response(body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

fn redirect_response(location: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 301 Moved Permanently\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        location
    )
    .into_bytes()
}

#[test]
fn test_end_to_end_external_roles() {
    let srcdir = TempDir::new().unwrap();
    fs::write(srcdir.path().join("python.inv"), python_inventory()).unwrap();

    let config = IntersphinxConfig::default().with_mapping_entry(MappingEntry::named(
        "python",
        "https://docs.python.org/3",
        vec![Some("python.inv".into())],
    ));
    let mut env = BuildEnvironment::new(srcdir.path(), &config);
    assert!(load_mappings_at(&mut env, &config, 1_000).unwrap());

    env.set_current_document(Some("guide/index"));
    env.set_default_domain(Some("py"));
    let mut nodes = read_inline(
        &env,
        ":external:class:`str` :external+python:ref:`Intro` :external:doc:`tutorial/index` \
         :py:class:`python:str` :doc:`tutorial/index` :external+nope:ref:`x`",
    );
    let stats = resolve_pending_references(&env, &mut nodes);
    assert_eq!(stats.resolved, 4);
    assert_eq!(stats.unresolved, 1);

    let references: Vec<(String, String)> = nodes
        .iter()
        .filter_map(Node::as_reference)
        .map(|r| (r.refuri.clone(), r.astext()))
        .collect();
    assert_eq!(
        references,
        vec![
            (
                "https://docs.python.org/3/library/stdtypes.html#str".to_string(),
                "str".to_string()
            ),
            (
                "https://docs.python.org/3/intro.html#intro".to_string(),
                "Introduction".to_string()
            ),
            (
                "https://docs.python.org/3/tutorial/index.html".to_string(),
                "Tutorial".to_string()
            ),
            (
                "https://docs.python.org/3/library/stdtypes.html#str".to_string(),
                "str".to_string()
            ),
        ]
    );
    assert!(nodes.iter().all(|n| n.as_pending_xref().is_none()));
    // std:doc is disabled for untagged references, so the plain :doc: stays text
    assert!(nodes.contains(&Node::Text(TextElement::inline("tutorial/index"))));

    let warnings = env.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::UnknownInventory);
    assert_eq!(warnings[0].docname.as_deref(), Some("guide/index"));
}

#[test]
fn test_external_miss_warns_and_keeps_content() {
    let srcdir = TempDir::new().unwrap();
    fs::write(srcdir.path().join("python.inv"), python_inventory()).unwrap();
    let config = IntersphinxConfig::default().with_mapping_entry(MappingEntry::named(
        "python",
        "https://docs.python.org/3",
        vec![Some("python.inv".into())],
    ));
    let mut env = BuildEnvironment::new(srcdir.path(), &config);
    load_mappings_at(&mut env, &config, 0).unwrap();

    let mut nodes = read_inline(&env, ":external:py:func:`nowhere`");
    resolve_pending_references(&env, &mut nodes);
    assert_eq!(nodes, vec![Node::Text(TextElement::literal("nowhere()"))]);
    assert_eq!(
        env.warnings()[0].message,
        "external py:func reference target not found: nowhere"
    );
}

#[test]
fn test_remote_cache_expiry_boundary() {
    let (base, hits) = serve(vec![("/objects.inv", ok_response(&python_inventory()))]);
    let srcdir = TempDir::new().unwrap();
    let config = IntersphinxConfig {
        cache_limit: 1,
        ..Default::default()
    }
    .with_mapping_entry(MappingEntry::named("python", &base, vec![None]));
    let mut env = BuildEnvironment::new(srcdir.path(), &config);

    let t0 = 1_700_000_000;
    assert!(load_mappings_at(&mut env, &config, t0).unwrap());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        env.intersphinx().cache()[base.as_str()].inventory["py:class"]["str"].uri,
        format!("{}/library/stdtypes.html#str", base)
    );

    // exactly cache_limit old: still fresh
    assert!(!load_mappings_at(&mut env, &config, t0 + DAY).unwrap());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // one second past the limit: refetched
    assert!(load_mappings_at(&mut env, &config, t0 + DAY + 1).unwrap());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(env.intersphinx().cache()[base.as_str()].timestamp, t0 + DAY + 1);
}

#[test]
fn test_local_inventory_always_refetched() {
    let srcdir = TempDir::new().unwrap();
    fs::write(srcdir.path().join("python.inv"), python_inventory()).unwrap();
    let config = IntersphinxConfig::default().with_mapping_entry(MappingEntry::named(
        "python",
        "https://docs.python.org/3",
        vec![Some("python.inv".into())],
    ));
    let mut env = BuildEnvironment::new(srcdir.path(), &config);

    assert!(load_mappings_at(&mut env, &config, 100).unwrap());
    assert!(load_mappings_at(&mut env, &config, 101).unwrap());
    assert_eq!(env.intersphinx().cache()["https://docs.python.org/3"].timestamp, 101);
}

#[test]
fn test_redirect_moves_base_uri() {
    let (base, hits) = serve(vec![
        ("/old/objects.inv", redirect_response("/new/objects.inv")),
        ("/new/objects.inv", ok_response(&python_inventory())),
    ]);
    let srcdir = TempDir::new().unwrap();
    let old = format!("{}/old", base);
    let config = IntersphinxConfig::default()
        .with_mapping_entry(MappingEntry::named("python", &old, vec![None]));
    let mut env = BuildEnvironment::new(srcdir.path(), &config);

    assert!(load_mappings_at(&mut env, &config, 0).unwrap());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    // cached under the configured URI, linking to the new location
    let entry = &env.intersphinx().cache()[old.as_str()];
    assert_eq!(
        entry.inventory["py:class"]["str"].uri,
        format!("{}/new/library/stdtypes.html#str", base)
    );
}

#[test]
fn test_remote_failure_falls_back_to_local_candidate() {
    let (base, _hits) = serve(vec![]);
    let srcdir = TempDir::new().unwrap();
    fs::write(srcdir.path().join("python.inv"), python_inventory()).unwrap();
    let config = IntersphinxConfig::default().with_mapping_entry(MappingEntry::named(
        "python",
        &base,
        vec![None, Some("python.inv".into())],
    ));
    let mut env = BuildEnvironment::new(srcdir.path(), &config);

    assert!(load_mappings_at(&mut env, &config, 0).unwrap());
    assert!(env.inventory_exists("python"));
    assert!(env.warnings().is_empty());
}

#[test]
fn test_cache_survives_between_environments() {
    let srcdir = TempDir::new().unwrap();
    fs::write(srcdir.path().join("python.inv"), python_inventory()).unwrap();
    let cache_path = srcdir.path().join("_build").join("intersphinx.json");
    let config = IntersphinxConfig::default().with_mapping_entry(MappingEntry::named(
        "python",
        "https://docs.python.org/3",
        vec![Some("python.inv".into())],
    ));

    let mut env = BuildEnvironment::new(srcdir.path(), &config);
    load_mappings_at(&mut env, &config, 0).unwrap();
    env.save_inventory_cache(&cache_path).unwrap();

    let mut restored = BuildEnvironment::new(srcdir.path(), &IntersphinxConfig::default());
    assert!(restored.load_inventory_cache(&cache_path).unwrap());
    assert!(restored.inventory_exists("python"));
    assert!(restored
        .intersphinx()
        .lookup("py", "function", "os.path.join")
        .is_some());
}
