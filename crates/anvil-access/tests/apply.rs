use anvil_access::{AccessError, AccessMap, Visibility};
use pretty_assertions::assert_eq;

const SERVER: &str = r#"package net.minecraft.server;

import java.util.List;

/** The server. */
@SuppressWarnings("unused")
public abstract class MinecraftServer implements Runnable {
    private final List<WorldServer> worldServers, backups;
    protected static int tickCounter = 0;

    MinecraftServer() {}

    private void tick() {}

    private void tick(boolean force) {}

    @Override
    public void run() { String s = "private void tick() {}"; }

    private static class ServerHangWatchdog extends Thread {
        private long lastTick;
    }

    enum State { STARTING, RUNNING; private int id; }
}
"#;

#[test]
fn nested_types_are_transformed_independently() {
    let map = AccessMap::from_json(
        r#"{
            "net.minecraft.server.MinecraftServer": { "visibility": "protected" },
            "net.minecraft.server.MinecraftServer$ServerHangWatchdog": { "visibility": "public" }
        }"#,
    )
    .unwrap();

    let out = map.apply(SERVER).unwrap();
    assert!(out.contains("@SuppressWarnings(\"unused\")\nprotected abstract class MinecraftServer"));
    assert!(out.contains("    public static class ServerHangWatchdog extends Thread {"));
    // members were not named, so they keep their keywords
    assert!(out.contains("        private long lastTick;"));
    assert!(out.contains("    private void tick() {}"));
}

#[test]
fn fields_and_all_method_overloads_follow_the_map() {
    let map = AccessMap::from_json(
        r#"{
            "net/minecraft/server/MinecraftServer.java": {
                "fields": { "backups": "public", "tickCounter": "package-private" },
                "methods": { "tick": "public", "MinecraftServer": "private" }
            },
            "net.minecraft.server.MinecraftServer.State": { "fields": { "id": "public" } }
        }"#,
    )
    .unwrap();

    let out = map.apply(SERVER).unwrap();
    assert!(out.contains("    public final List<WorldServer> worldServers, backups;"));
    assert!(out.contains("    static int tickCounter = 0;"));
    assert!(out.contains("    public void tick() {}"));
    assert!(out.contains("    public void tick(boolean force) {}"));
    // constructors are not methods
    assert!(out.contains("    MinecraftServer() {}"));
    // literals are opaque
    assert!(out.contains("\"private void tick() {}\""));
    assert!(out.contains("enum State { STARTING, RUNNING; public int id; }"));
}

#[test]
fn unmapped_source_is_unchanged() {
    let map = AccessMap::from_json(r#"{ "net.minecraft.server.Other": { "visibility": "public" } }"#)
        .unwrap();
    assert_eq!(map.apply(SERVER).unwrap(), SERVER);
}

#[test]
fn malformed_source_is_an_error() {
    let map = AccessMap::from_json(r#"{ "a.B": { "visibility": "public" } }"#).unwrap();
    let err = map
        .apply("package a;\n\nclass B {\n  int x = ;\n}\n")
        .unwrap_err();
    match err {
        AccessError::Parse { line, .. } => assert_eq!(line, 4),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn map_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access.json");
    std::fs::write(&path, r#"{ "a.B": { "methods": { "run": "PRIVATE" } } }"#).unwrap();

    let map = AccessMap::from_path(&path).unwrap();
    assert_eq!(map.get("a/B").unwrap().method("run"), Some(Visibility::Private));

    assert!(matches!(
        AccessMap::from_path(&dir.path().join("missing.json")),
        Err(AccessError::Io { .. })
    ));
}
