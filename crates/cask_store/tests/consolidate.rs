use cask_core::error::Error;
use cask_core::hash::Hash;
use cask_core::store::{PathHash, StorePath};
use cask_core::types::TrustId;
use cask_store::api::Store;
use cask_store::consolidate::{
    consolidate_paths, find_trusted_eq_member, find_trusted_eq_members,
};
use cask_store::stores::mem::MemStore;
use std::collections::BTreeSet;

fn path(seed: u8, name: &str) -> StorePath {
    StorePath::new(&PathHash::from_hash(&Hash::Sha256([seed; 32])), name)
}

fn trust(id: &str) -> TrustId {
    id.to_string()
}

async fn member(store: &MemStore, class: &StorePath, trust_id: &str, p: &StorePath) {
    store.add_eq_member(class, &trust(trust_id), p).await.unwrap();
}

#[tokio::test]
async fn disjoint_classes_are_untouched() {
    let store = MemStore::new();
    let (a, b, c) = (path(1, "liba"), path(2, "libb"), path(3, "libc"));
    for p in [&a, &b, &c] {
        store.add_blob(p, p.as_bytes(), []);
    }
    member(&store, &path(10, "liba.out"), "root", &a).await;
    member(&store, &path(11, "libb.out"), "root", &b).await;
    member(&store, &path(12, "libc.out"), "root", &c).await;

    let paths: BTreeSet<_> = [a, b, c].into();
    let (result, replacements) = consolidate_paths(&store, &paths, false, &trust("alice"))
        .await
        .unwrap();
    assert_eq!(result, paths);
    assert!(replacements.is_empty());
}

#[tokio::test]
async fn check_only_fails_on_conflict() {
    let store = MemStore::new();
    let a1 = path(1, "liba");
    let a2 = path(2, "liba");
    store.add_blob(&a1, b"one", []);
    store.add_blob(&a2, b"two", []);
    let class_a = path(10, "liba.out");
    member(&store, &class_a, "root", &a1).await;
    member(&store, &class_a, "root", &a2).await;

    let paths: BTreeSet<_> = [a1, a2].into();
    let err = consolidate_paths(&store, &paths, true, &trust("alice"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::Conflict(_))
    ));
}

#[tokio::test]
async fn single_conflict_rewrites_the_referrer() {
    let store = MemStore::new();
    let a1 = path(1, "liba");
    let a2 = path(2, "liba");
    let b = path(3, "libb");
    store.add_blob(&a1, b"liba one", []);
    store.add_blob(&a2, b"liba two", []);
    let content = format!("prog\n/cask/store/{a1}\n/cask/store/{a2}\n");
    store.add_blob(&b, content.as_bytes(), [&a1, &a2]);

    let class_a = path(10, "liba.out");
    let class_b = path(11, "libb.out");
    member(&store, &class_a, "root", &a1).await;
    member(&store, &class_a, "root", &a2).await;
    member(&store, &class_b, "root", &b).await;

    let paths: BTreeSet<_> = [a1.clone(), a2.clone(), b.clone()].into();
    let (result, replacements) = consolidate_paths(&store, &paths, false, &trust("alice"))
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    let kept = [&a1, &a2]
        .into_iter()
        .find(|p| result.contains(*p))
        .unwrap()
        .clone();
    let dropped = if kept == a1 { a2.clone() } else { a1.clone() };

    let b_new = replacements.get(&b).unwrap().clone();
    assert_ne!(b_new, b);
    assert!(result.contains(&b_new));
    assert_eq!(
        store.query_references(&b_new).await.unwrap(),
        [kept.clone()].into()
    );

    // both embedded occurrences now point at the survivor
    let rewritten = String::from_utf8(store.content(&b_new).unwrap()).unwrap();
    assert!(rewritten.contains(kept.hash_part().as_str()));
    assert!(!rewritten.contains(dropped.hash_part().as_str()));

    assert_eq!(replacements.iter().filter(|(f, t)| f != t).count(), 1);

    // the rewritten path joined b's class, stamped with the acting principal
    let members = store.query_eq_members(&class_b).await.unwrap();
    assert!(members
        .iter()
        .any(|m| m.path == b_new && m.trust_id == "alice"));
}

#[tokio::test]
async fn sources_pass_through_untouched() {
    let store = MemStore::new();
    let src = path(6, "hello-2.1.tar");
    let a1 = path(1, "hello");
    let a2 = path(2, "hello");
    store.add_blob(&src, b"tarball", []);
    let content = format!("built from /cask/store/{src}\n");
    store.add_blob(&a1, content.as_bytes(), [&src]);
    store.add_blob(&a2, b"hello two", []);

    let class_a = path(10, "hello.out");
    member(&store, &class_a, "root", &a1).await;
    member(&store, &class_a, "root", &a2).await;

    let paths: BTreeSet<_> = [src.clone(), a1.clone(), a2.clone()].into();
    let (result, replacements) = consolidate_paths(&store, &paths, false, &trust("alice"))
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert!(result.contains(&src));
    assert!(replacements.iter().all(|(f, t)| f == t));
}

/// Two users built libX11 independently; Xext links foo's copy, Xt links
/// root's, and Xmu links both libraries. Consolidation must leave a single
/// libX11 in the closure.
#[tokio::test]
async fn cross_user_library_conflict() {
    let store = MemStore::new();
    let foo_x11 = path(1, "libX11");
    let root_x11 = path(2, "libX11");
    let foo_xext = path(3, "libXext");
    let root_xt = path(4, "libXt");
    let foo_xmu = path(5, "libXmu");

    store.add_blob(&foo_x11, b"libX11 built by foo", []);
    store.add_blob(&root_x11, b"libX11 built by root", []);
    let c = format!("libXext\nrpath /cask/store/{foo_x11}\n");
    store.add_blob(&foo_xext, c.as_bytes(), [&foo_x11]);
    let c = format!("libXt\nrpath /cask/store/{root_x11}\n");
    store.add_blob(&root_xt, c.as_bytes(), [&root_x11]);
    let c = format!("libXmu\nrpath /cask/store/{foo_xext} /cask/store/{root_xt}\n");
    store.add_blob(&foo_xmu, c.as_bytes(), [&foo_xext, &root_xt]);

    let x11 = path(20, "libX11.out");
    let xext = path(21, "libXext.out");
    let xt = path(22, "libXt.out");
    let xmu = path(23, "libXmu.out");
    member(&store, &x11, "foo", &foo_x11).await;
    member(&store, &x11, "root", &root_x11).await;
    member(&store, &xext, "foo", &foo_xext).await;
    member(&store, &xt, "root", &root_xt).await;
    member(&store, &xmu, "foo", &foo_xmu).await;

    let paths: BTreeSet<_> = [
        foo_x11.clone(),
        root_x11.clone(),
        foo_xext.clone(),
        root_xt.clone(),
        foo_xmu.clone(),
    ]
    .into();
    let (result, replacements) = consolidate_paths(&store, &paths, false, &trust("foo"))
        .await
        .unwrap();

    assert_eq!(result.len(), 4);

    // exactly one libX11 survives
    let survivors = [&foo_x11, &root_x11]
        .into_iter()
        .filter(|p| result.contains(*p))
        .count();
    assert_eq!(survivors, 1);

    // at most one member of every class in the result
    for class in [&x11, &xext, &xt, &xmu] {
        let members: BTreeSet<_> = store
            .query_eq_members(class)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.path)
            .collect();
        assert!(
            members.intersection(&result).count() <= 1,
            "class `{class}' kept several members"
        );
    }

    // the result is closed under references
    for p in &result {
        for r in store.query_references(p).await.unwrap() {
            assert!(
                r == *p || result.contains(&r),
                "reference `{r}' of `{p}' left the closure"
            );
        }
    }

    // whichever libX11 wins, the other library and libXmu above it get
    // rewritten, and that matches the selection cost
    assert_eq!(replacements.iter().filter(|(f, t)| f != t).count(), 2);

    // a second pass finds nothing left to do
    let (again, replacements) = consolidate_paths(&store, &result, false, &trust("foo"))
        .await
        .unwrap();
    assert_eq!(again, result);
    assert!(replacements.is_empty());
}

#[tokio::test]
async fn trusted_members_filter_by_principal() {
    let store = MemStore::new();
    let class = path(10, "libz.out");
    let by_root = path(1, "libz");
    let by_foo = path(2, "libz");
    let by_bar = path(3, "libz");
    member(&store, &class, "root", &by_root).await;
    member(&store, &class, "foo", &by_foo).await;
    member(&store, &class, "bar", &by_bar).await;

    let trusted = find_trusted_eq_members(&store, &class, &trust("foo"))
        .await
        .unwrap();
    assert_eq!(trusted, [by_root, by_foo].into());

    let empty = path(11, "nothing.out");
    let err = find_trusted_eq_member(&store, &empty, &trust("foo"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::NoClassMember(_))
    ));
}
