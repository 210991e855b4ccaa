use baker::trie::Trie;

#[test]
fn test_put_get_del() {
    let mut trie = Trie::new();
    trie.put("/", 1);

    assert_eq!(trie.len(), 1);
    assert_eq!(trie.get("/"), Some(&1));

    trie.del("/");
    assert_eq!(trie.len(), 0);
    assert_eq!(trie.get("/"), None);
}

#[test]
fn test_nested_keys() {
    let mut trie = Trie::new();
    trie.put("/a/b/c", 1);
    trie.put("/a/b", 2);

    assert_eq!(trie.get("/a/b/c"), Some(&1));
    assert_eq!(trie.get("/a/b"), Some(&2));

    trie.del("/a/b/c");
    assert_eq!(trie.get_exact("/a/b/c"), None);
    assert_eq!(trie.get("/a/b"), Some(&2));

    // 최장 접두사 매칭이므로 지워진 키는 부모로 넘어갑니다
    assert_eq!(trie.get("/a/b/c"), Some(&2));
}

#[test]
fn test_longest_prefix_match() {
    let mut trie = Trie::new();
    trie.put("/a", 1);
    trie.put("/a/b", 2);

    assert_eq!(trie.get("/a/b/c"), Some(&2));
    assert_eq!(trie.get("/a/x"), Some(&1));
    assert_eq!(trie.get("/z"), None);
}

#[test]
fn test_overwrite_keeps_len() {
    let mut trie = Trie::new();
    trie.put("/a", 1);
    trie.put("/a", 2);

    assert_eq!(trie.len(), 1);
    assert_eq!(trie.get("/a"), Some(&2));
}

#[test]
fn test_del_prunes_empty_branches() {
    let mut trie = Trie::new();
    trie.put("/a/b/c", 1);
    trie.put("/a", 2);

    assert_eq!(trie.del("/a/b/c"), Some(1));
    assert_eq!(trie.del("/a/b/c"), None);

    // 가지가 정리되어도 남은 키는 그대로
    assert_eq!(trie.get_exact("/a"), Some(&2));
    assert_eq!(trie.len(), 1);
}

#[test]
fn test_empty_key_acts_as_catch_all() {
    let mut trie = Trie::new();
    trie.put("", 1);

    assert_eq!(trie.get("/anything"), Some(&1));
    assert_eq!(trie.get(""), Some(&1));
}

#[test]
fn test_unicode_keys() {
    let mut trie = Trie::new();
    trie.put("/사용자", 1);

    assert_eq!(trie.get("/사용자/10"), Some(&1));
    assert_eq!(trie.get("/사용"), None);
}
