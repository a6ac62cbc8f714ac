//! Security invariant tests for the x402 negotiation workspace.
//!
//! These scan production sources so that regressions in key handling,
//! credential construction and HTTP hardening fail `cargo test --workspace`.

use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// Read all .rs source files from production crates (excluding tests and this crate).
fn production_source_files() -> Vec<(String, String)> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap();

    let crates_dir = root.join("crates");
    let mut files = Vec::new();

    for entry in WalkDir::new(&crates_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }

        let path_str = path.to_str().unwrap_or("");
        if path_str.contains("security-audit") {
            continue;
        }
        if path_str.contains("tests/") || path_str.contains("\\tests\\") {
            continue;
        }

        if let Ok(content) = std::fs::read_to_string(path) {
            files.push((path_str.replace('\\', "/"), content));
        }
    }

    files
}

/// Drop everything from the first `#[cfg(test)]` / `mod tests` onwards, plus
/// comment lines (doc examples are allowed to unwrap).
fn production_lines(content: &str) -> String {
    let mut result = Vec::new();

    for line in content.lines() {
        if line.contains("#[cfg(test)]") || line.trim().starts_with("mod tests") {
            break;
        }
        if line.trim_start().starts_with("//") {
            continue;
        }
        result.push(line);
    }

    result.join("\n")
}

#[test]
fn sources_are_found() {
    let files = production_source_files();
    assert!(
        files.iter().any(|(p, _)| p.ends_with("x402-negotiate/src/negotiation.rs")),
        "audit did not find the core crate sources"
    );
}

#[test]
fn no_hardcoded_private_keys_in_production_code() {
    let hex_64_re = Regex::new(r"0x[a-fA-F0-9]{64}").unwrap();

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);

        if let Some(mat) = hex_64_re.find(&prod_content) {
            let line_num = prod_content[..mat.start()].lines().count() + 1;
            panic!(
                "Potential hardcoded secret found at {}:{}: {}",
                path,
                line_num,
                mat.as_str()
            );
        }
    }
}

#[test]
fn credentials_are_built_and_parsed_only_in_proof_module() {
    let scheme_literal_re =
        Regex::new(r#"(format!\(\s*"x402 |strip_prefix\(\s*"x402|"x402 \{)"#).unwrap();

    for (path, content) in &production_source_files() {
        if path.ends_with("x402-negotiate/src/proof.rs") {
            continue;
        }
        let prod_content = production_lines(content);

        assert!(
            !scheme_literal_re.is_match(&prod_content),
            "{} builds or parses the x402 credential by hand. \
             Use x402::proof::encode/decode or ProofOfPayment::credential.",
            path
        );
    }
}

#[test]
fn library_crates_propagate_errors() {
    let panic_re = Regex::new(r"\.unwrap\(\)|\.expect\(|panic!\(").unwrap();

    for (path, content) in &production_source_files() {
        let is_library = path.contains("x402-negotiate/src/")
            || path.contains("x402-negotiate-wallet/src/")
            || path.contains("x402-negotiate-client/src/");
        if !is_library || path.ends_with("main.rs") {
            continue;
        }

        let prod_content = production_lines(content);
        for (i, line) in prod_content.lines().enumerate() {
            assert!(
                !panic_re.is_match(line),
                "{}:{} can panic in library code: {}",
                path,
                i + 1,
                line.trim()
            );
        }
    }
}

#[test]
fn http_clients_disable_redirects() {
    let builder_re = Regex::new(r"reqwest::Client::builder\(\)").unwrap();
    let redirect_re = Regex::new(r"redirect\s*\(\s*.*Policy::none\(\)").unwrap();

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);

        for mat in builder_re.find_iter(&prod_content) {
            let search_end = (mat.end() + 500).min(prod_content.len());
            let builder_chain = &prod_content[mat.start()..search_end];

            assert!(
                redirect_re.is_match(builder_chain),
                "reqwest::Client::builder() at {} does not set redirect(Policy::none()). \
                 A redirect could carry the payment credential to another host.",
                path
            );
        }
    }
}

#[test]
fn constant_time_uses_subtle_crate() {
    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);

        if prod_content.contains("fn constant_time_eq") {
            assert!(
                prod_content.contains("subtle::") || prod_content.contains("use subtle"),
                "File {} contains constant_time_eq that doesn't use the subtle crate.",
                path
            );
        }
    }
}

#[test]
fn metrics_endpoint_is_guarded() {
    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);
        if !prod_content.contains("#[get(\"/metrics\")]") {
            continue;
        }

        assert!(
            prod_content.contains("bearer_matches") && prod_content.contains("public_metrics"),
            "/metrics handler at {} must check the bearer token or the public opt-in",
            path
        );
    }
}

#[test]
fn error_responses_do_not_leak_internals() {
    let leak_re = Regex::new(r#"json!\(.*(\{e\}|e\.to_string\(\)|"error":\s*e\b)"#).unwrap();

    for (path, content) in &production_source_files() {
        if !content.contains("HttpResponse::") {
            continue;
        }

        let prod_content = production_lines(content);
        for (i, line) in prod_content.lines().enumerate() {
            assert!(
                !leak_re.is_match(line) && !line.contains("RUST_BACKTRACE"),
                "Internal error detail in HTTP response at {}:{}. Log it server-side instead.",
                path,
                i + 1
            );
        }
    }
}
