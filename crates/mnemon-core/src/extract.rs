//! Entity Extraction
//!
//! Pure function from content to an entity set. Three sources, unioned in
//! order and deduplicated case-preserving:
//!
//! 1. Regex families: CamelCase identifiers, ALL_CAPS tokens, file-path-like
//!    tokens, URLs, @mentions, Chinese book-title marks
//! 2. A bundled dictionary of well-known technology names (case-sensitive)
//! 3. Caller-provided entities, appended verbatim
//!
//! Total cap is 50; excess is silently truncated in insertion order.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::MAX_ENTITIES;
use crate::similarity::is_stopword;

// ============================================================================
// TECHNICAL DICTIONARY
// ============================================================================

/// Well-known technology and product names, matched case-sensitively
/// against the content's words
pub static TECH_DICTIONARY: &[&str] = &[
    // Languages
    "Rust", "Python", "JavaScript", "TypeScript", "Java", "Kotlin", "Swift",
    "Go", "Golang", "Ruby", "PHP", "Scala", "Haskell", "Erlang", "Elixir",
    "Clojure", "Lua", "Perl", "Julia", "Zig", "Dart", "OCaml", "Fortran",
    "COBOL", "Assembly", "WebAssembly", "Solidity", "Bash", "PowerShell",
    // Databases & storage
    "PostgreSQL", "Postgres", "MySQL", "MariaDB", "SQLite", "MongoDB",
    "Redis", "Memcached", "Cassandra", "ScyllaDB", "CockroachDB", "DynamoDB",
    "Elasticsearch", "OpenSearch", "ClickHouse", "DuckDB", "Snowflake",
    "BigQuery", "Redshift", "Neo4j", "ArangoDB", "InfluxDB", "TimescaleDB",
    "Qdrant", "Milvus", "Pinecone", "Weaviate", "Chroma", "FAISS",
    "RocksDB", "LevelDB", "LMDB", "etcd", "Consul", "ZooKeeper",
    // Infra & cloud
    "Docker", "Kubernetes", "Podman", "Terraform", "Ansible", "Puppet",
    "Chef", "Vagrant", "Nomad", "Helm", "Istio", "Envoy", "Nginx", "Apache",
    "Caddy", "HAProxy", "Traefik", "Cloudflare", "Fastly", "Akamai",
    "Lambda", "Fargate", "Heroku", "Vercel", "Netlify", "DigitalOcean",
    "Linode", "Firebase", "Supabase", "Railway",
    // Messaging & streaming
    "Kafka", "RabbitMQ", "NATS", "Pulsar", "ZeroMQ", "MQTT", "Celery",
    "Sidekiq", "Airflow", "Dagster", "Temporal", "Flink", "Spark", "Storm",
    // Frameworks & libraries
    "React", "Vue", "Angular", "Svelte", "SolidJS", "Astro", "Django",
    "Flask", "FastAPI", "Rails", "Laravel", "Spring", "Quarkus", "Micronaut",
    "Express", "Fastify", "Axum", "Actix", "Rocket", "Tokio", "Hyper",
    "Tonic", "Serde", "Diesel", "SQLAlchemy", "Hibernate", "Prisma",
    "GraphQL", "gRPC", "Thrift", "Avro", "Protobuf", "OpenAPI", "Swagger",
    "jQuery", "Electron", "Tauri", "Flutter", "Qt", "GTK",
    // ML & data
    "PyTorch", "TensorFlow", "Keras", "JAX", "NumPy", "SciPy", "Pandas",
    "Polars", "scikit-learn", "XGBoost", "LightGBM", "Hugging", "Ollama",
    "LangChain", "LlamaIndex", "OpenAI", "Anthropic", "Claude", "GPT",
    "Llama", "Mistral", "Gemini", "BERT", "CUDA", "ONNX", "Triton",
    // Tools & platforms
    "Git", "GitHub", "GitLab", "Bitbucket", "Jenkins", "CircleCI",
    "Prometheus", "Grafana", "Datadog", "Sentry", "Loki", "Jaeger",
    "OpenTelemetry", "Splunk", "PagerDuty", "Jira", "Confluence", "Slack",
    "Discord", "Notion", "Figma", "VSCode", "Vim", "Neovim", "Emacs",
    "IntelliJ", "Xcode", "Bazel", "Gradle", "Maven", "CMake", "Make",
    "Webpack", "Vite", "Rollup", "esbuild", "Babel", "ESLint", "Prettier",
    "Cargo", "npm", "pnpm", "yarn", "pip", "Poetry", "Conda", "Homebrew",
    "Nix", "systemd", "SELinux", "WireGuard", "OpenSSL", "OAuth", "JWT",
    "SAML", "Keycloak", "Auth0", "Stripe", "Twilio", "Kibana", "Logstash",
    // OS & hardware
    "Linux", "Ubuntu", "Debian", "Fedora", "Arch", "Alpine", "FreeBSD",
    "macOS", "Windows", "Android", "iOS", "Raspberry", "ARM", "RISC-V",
];

// ============================================================================
// REGEX FAMILIES
// ============================================================================

static CAMEL_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+\b").unwrap());

static ALL_CAPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9_]+\b").unwrap());

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z][a-zA-Z0-9+.-]*://[^\s<>\u{300a}\u{300b}]+").unwrap());

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[A-Za-z0-9_][A-Za-z0-9_.-]*").unwrap());

static BOOK_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("《([^》]+)》").unwrap());

// ============================================================================
// EXTRACTION
// ============================================================================

/// Extract the entity set for a piece of content, merged with
/// caller-provided entities and capped at 50
pub fn extract_entities(content: &str, provided: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entities: Vec<String> = Vec::new();

    let mut push = |candidate: &str, entities: &mut Vec<String>| {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return;
        }
        if seen.insert(candidate.to_string()) {
            entities.push(candidate.to_string());
        }
    };

    // URLs first so path detection can skip them
    let urls: Vec<&str> = URL.find_iter(content).map(|m| m.as_str()).collect();
    for url in &urls {
        push(url.trim_end_matches(['.', ',', ';', ')']), &mut entities);
    }

    for m in CAMEL_CASE.find_iter(content) {
        push(m.as_str(), &mut entities);
    }

    for m in ALL_CAPS.find_iter(content) {
        let token = m.as_str();
        if token.len() >= 2 && !is_stopword(&token.to_lowercase()) {
            push(token, &mut entities);
        }
    }

    // File-path-like tokens: contain '/' or start with "./", and are not URLs
    for word in content.split_whitespace() {
        let word = word.trim_matches(|c: char| matches!(c, ',' | ';' | ')' | '(' | '"' | '\''));
        if word.is_empty() || urls.iter().any(|u| u.contains(word) || word.contains(u)) {
            continue;
        }
        if word.starts_with("./") || (word.contains('/') && !word.contains("://")) {
            push(word, &mut entities);
        }
    }

    for m in MENTION.find_iter(content) {
        push(m.as_str(), &mut entities);
    }

    for cap in BOOK_TITLE.captures_iter(content) {
        if let Some(inner) = cap.get(1) {
            push(inner.as_str(), &mut entities);
        }
    }

    // Dictionary names, case-sensitive, word-level
    let words: HashSet<&str> = content
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && !matches!(c, '+' | '#' | '.' | '-')))
        .filter(|w| !w.is_empty())
        .collect();
    for name in TECH_DICTIONARY {
        if words.contains(name) {
            push(name, &mut entities);
        }
    }

    // Caller-provided entities appended verbatim
    for entity in provided {
        push(entity, &mut entities);
    }

    entities.truncate(MAX_ENTITIES);
    entities
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_identifiers_are_extracted() {
        let entities = extract_entities("We use HttpServer and DataStore", &[]);
        assert!(entities.contains(&"HttpServer".to_string()));
        assert!(entities.contains(&"DataStore".to_string()));
    }

    #[test]
    fn all_caps_tokens_skip_stopwords() {
        let entities = extract_entities("IF the API fails, check TLS and DNS", &[]);
        assert!(entities.contains(&"API".to_string()));
        assert!(entities.contains(&"TLS".to_string()));
        assert!(entities.contains(&"DNS".to_string()));
        assert!(!entities.contains(&"IF".to_string()));
    }

    #[test]
    fn paths_urls_and_mentions_are_extracted() {
        let entities = extract_entities(
            "See https://example.com/docs and ./config/app.toml, ping @oncall, fix src/main.rs",
            &[],
        );
        assert!(entities.iter().any(|e| e.starts_with("https://example.com")));
        assert!(entities.contains(&"./config/app.toml".to_string()));
        assert!(entities.contains(&"@oncall".to_string()));
        assert!(entities.contains(&"src/main.rs".to_string()));
    }

    #[test]
    fn book_title_marks_are_extracted() {
        let entities = extract_entities("正在读《设计数据密集型应用》这本书", &[]);
        assert!(entities.contains(&"设计数据密集型应用".to_string()));
    }

    #[test]
    fn dictionary_matches_are_case_sensitive() {
        let entities = extract_entities("Deployed postgres next to PostgreSQL and Redis", &[]);
        assert!(entities.contains(&"PostgreSQL".to_string()));
        assert!(entities.contains(&"Redis".to_string()));
        // lowercase "postgres" is not a dictionary hit
        assert!(!entities.contains(&"postgres".to_string()));
    }

    #[test]
    fn provided_entities_are_appended_verbatim() {
        let entities = extract_entities("nothing notable here", &["Qdrant".into(), "Milvus".into()]);
        assert!(entities.contains(&"Qdrant".to_string()));
        assert!(entities.contains(&"Milvus".to_string()));
    }

    #[test]
    fn duplicates_collapse_case_preserving() {
        let entities = extract_entities("Redis Redis Redis", &["Redis".into()]);
        assert_eq!(
            entities.iter().filter(|e| e.as_str() == "Redis").count(),
            1
        );
    }

    #[test]
    fn entity_cap_truncates_in_insertion_order() {
        let provided: Vec<String> = (0..80).map(|i| format!("Entity{}", i)).collect();
        let entities = extract_entities("plain text", &provided);
        assert_eq!(entities.len(), MAX_ENTITIES);
        assert_eq!(entities[0], "Entity0");
    }

    #[test]
    fn extraction_is_deterministic() {
        let content = "HttpServer at src/http/mod.rs uses TLS via https://internal/docs @dev";
        let a = extract_entities(content, &[]);
        let b = extract_entities(content, &[]);
        assert_eq!(a, b);
    }
}
