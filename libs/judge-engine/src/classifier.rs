/// Safety Classifier - Static Screening of Submitted Source
///
/// **Core Responsibility:**
/// Reject code that reaches for the filesystem, spawns processes, opens
/// network connections or evaluates code at runtime, before any of it runs.
///
/// **Critical Properties:**
/// - Pure pattern matching, never executes anything
/// - Blocklist: anything not matched is allowed through
/// - Categories are checked in a fixed order, first match wins
/// - Rule sets are compiled once per process and shared read-only
///
/// This is a fast pre-filter. Containment of whatever slips through is the
/// sandbox's job.

use judge_common::types::Language;
use lazy_static::lazy_static;
use regex::RegexSet;
use std::fmt;

/// Dangerous operation families, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreatCategory {
    FileSystem,
    ProcessExecution,
    Network,
    DynamicEvaluation,
}

impl ThreatCategory {
    const ORDER: [ThreatCategory; 4] = [
        ThreatCategory::FileSystem,
        ThreatCategory::ProcessExecution,
        ThreatCategory::Network,
        ThreatCategory::DynamicEvaluation,
    ];
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatCategory::FileSystem => write!(f, "filesystem"),
            ThreatCategory::ProcessExecution => write!(f, "process_execution"),
            ThreatCategory::Network => write!(f, "network"),
            ThreatCategory::DynamicEvaluation => write!(f, "dynamic_evaluation"),
        }
    }
}

/// Outcome of screening one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Unsafe {
        category: ThreatCategory,
        /// The rule that matched; for logs, never for the candidate
        rule: &'static str,
    },
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

const COMMON_FILESYSTEM: &[&str] = &[r"/etc/(passwd|shadow|hosts)", r"/proc/self", r"/dev/(tcp|udp)/"];

const JS_FILESYSTEM: &[&str] = &[
    r#"require\s*\(\s*['"`](node:)?fs(/promises)?['"`]\s*\)"#,
    r#"\bfrom\s+['"](node:)?fs(/promises)?['"]"#,
    r"\bfs\s*\.\s*(read|write|append|unlink|rm|mkdir|open|create|copy|rename|stat|access|watch)\w*",
    r"\b(readFileSync|writeFileSync|appendFileSync|unlinkSync|rmSync|readdirSync)\b",
];
const JS_PROCESS: &[&str] = &[
    r"\bchild_process\b",
    r"\bprocess\s*\.\s*(exit|kill|abort|binding|dlopen|chdir|setuid|setgid|reallyExit)\b",
    r"\b(execSync|spawnSync|execFileSync)\b",
    r#"require\s*\(\s*['"`](node:)?(worker_threads|cluster)['"`]"#,
    // Module names must be a single plain literal
    r#"\brequire\s*\(\s*[^'"`\s]"#,
    r#"\brequire\s*\(\s*['"`][^'"`]*['"`]\s*[^)\s]"#,
    r#"\brequire\s*\(\s*`[^`]*\$\{"#,
];
const JS_NETWORK: &[&str] = &[
    r#"require\s*\(\s*['"`](node:)?(http|https|http2|net|dgram|tls|dns)['"`]"#,
    r#"\bfrom\s+['"](node:)?(http|https|http2|net|dgram|tls|dns)['"]"#,
    r#"require\s*\(\s*['"`](axios|node-fetch|request|ws|mongodb|mongoose|pg|mysql2?|redis|ioredis)['"`]"#,
    r"\bfetch\s*\(",
    r"\bXMLHttpRequest\b",
    r"\bWebSocket\b",
    r"\bnavigator\s*\.\s*sendBeacon\b",
];
const JS_EVALUATION: &[&str] = &[
    r"(^|[^.\w$])eval\s*\(",
    r"\bnew\s+Function\b",
    r"(^|[^.\w$])Function\s*\(",
    r#"\bset(Timeout|Interval|Immediate)\s*\(\s*['"`]"#,
    r#"require\s*\(\s*['"`](node:)?(vm|v8|module|inspector)['"`]"#,
    r"\bimport\s*\(",
    r"__proto__",
    r"\bconstructor\s*(\.\s*constructor\b|\[)",
    r"\.\s*constructor\s*\(",
    r#"\[\s*['"`]constructor"#,
    // Member names assembled at runtime: obj['exec' + 'Sync']
    r#"\[\s*['"`][^'"`\]]*['"`]\s*\+"#,
    r"\bObject\s*\.\s*setPrototypeOf\b",
    r"\b(Object|Array|String|Function|Number|Boolean)\s*\.\s*prototype\s*(\.\s*\w+|\[[^\]]*\])\s*=[^=]",
    r"\bglobalThis\b",
    r"\bglobal\s*\.",
    r"\bReflect\s*\.",
    r"\bprocess\s*\.\s*(env|mainModule)\b",
    r"\brequire\s*\.\s*cache\b",
    r"\bmodule\s*\.\s*constructor\b",
];

const PY_FILESYSTEM: &[&str] = &[
    r"(^|[^.\w])open\s*\(",
    r"(?m)^\s*(import|from)\s+(os|shutil|pathlib|io|glob|tempfile|fileinput)\b",
    r"\bos\s*\.\s*(remove|unlink|rmdir|mkdir|makedirs|listdir|rename|walk|scandir|chmod|chown)\b",
    r"\bshutil\s*\.",
    r"\bPath\s*\(",
];
const PY_PROCESS: &[&str] = &[
    r"\bsubprocess\b",
    r"\bos\s*\.\s*(system|popen|exec\w*|spawn\w*|fork|kill|_exit)\b",
    r"\bsys\s*\.\s*exit\b",
    r"(^|[^.\w])(exit|quit)\s*\(",
    r"(?m)^\s*(import|from)\s+(multiprocessing|pty|signal|ctypes|threading)\b",
];
const PY_NETWORK: &[&str] = &[
    r"(?m)^\s*(import|from)\s+(socket|ssl|urllib\d?|requests|http|httpx|aiohttp|ftplib|smtplib|telnetlib|xmlrpc|asyncio|sqlite3|psycopg2?|pymysql|pymongo|redis)\b",
    r"\burlopen\s*\(",
];
const PY_EVALUATION: &[&str] = &[
    r"(^|[^.\w])(eval|exec|compile)\s*\(",
    r"__import__",
    r"__builtins__",
    r"(^|[^.\w])(globals|locals|vars)\s*\(",
    r"(^|[^.\w])(getattr|setattr|delattr)\s*\(",
    r"__(subclasses|globals|code|class|bases|mro|loader|spec)__",
    r"(?m)^\s*(import|from)\s+(importlib|builtins|inspect|pickle|marshal|code|codeop|sys)\b",
];

const JAVA_FILESYSTEM: &[&str] = &[
    r"\bjava\s*\.\s*nio\s*\.\s*file\b",
    r"\bjava\s*\.\s*io\s*\.\s*(File|FileInputStream|FileOutputStream|FileReader|FileWriter|RandomAccessFile)\b",
    r"\bnew\s+(File|FileInputStream|FileOutputStream|FileReader|FileWriter|RandomAccessFile)\b",
    r"\b(Files|Paths)\s*\.",
];
const JAVA_PROCESS: &[&str] = &[
    r"\bRuntime\s*\.\s*getRuntime\b",
    r"\bProcessBuilder\b",
    r"\bProcessHandle\b",
    r"\bSystem\s*\.\s*(exit|load|loadLibrary|setSecurityManager)\b",
];
const JAVA_NETWORK: &[&str] = &[
    r"\bjava\s*\.\s*(net|sql)\b",
    r"\bjavax\s*\.\s*net\b",
    r"\b(Socket|ServerSocket|DatagramSocket|URL|URLConnection|HttpURLConnection|HttpClient|DriverManager)\b",
];
const JAVA_EVALUATION: &[&str] = &[
    r"\bClass\s*\.\s*forName\b",
    r"\bjava\s*\.\s*lang\s*\.\s*(reflect|invoke)\b",
    r"\.\s*(getDeclaredMethod|getDeclaredField|getDeclaredConstructor|getMethod|setAccessible|newInstance)\s*\(",
    r"\bScriptEngine(Manager)?\b",
    r"\bsun\s*\.\s*misc\b",
    r"\bClassLoader\b",
    r"\bSystem\s*\.\s*(getenv|getProperty|setProperty)\b",
];

const GO_FILESYSTEM: &[&str] = &[
    r#""(os|io/ioutil|io/fs|path/filepath)""#,
    r"\bos\s*\.\s*(Open|OpenFile|Create|ReadFile|WriteFile|Remove|RemoveAll|Mkdir|MkdirAll|ReadDir|Chmod)\b",
    r"\bioutil\s*\.",
];
const GO_PROCESS: &[&str] = &[
    r#""(os/exec|os/signal|syscall)""#,
    r"\bexec\s*\.\s*Command\b",
    r"\bsyscall\s*\.",
    r"\bos\s*\.\s*(Exit|StartProcess|Getenv|Environ)\b",
];
const GO_NETWORK: &[&str] = &[
    r#""net(/[\w/]+)?""#,
    r#""database/sql""#,
    r"\bnet\s*\.\s*(Dial|Listen)\w*",
    r"\bhttp\s*\.\s*(Get|Post|Head|NewRequest|Client)\b",
];
const GO_EVALUATION: &[&str] = &[
    r#""(reflect|unsafe|plugin|runtime/debug)""#,
    r"//\s*go:linkname",
    r#"(?m)^\s*import\s+"C""#,
];

/// Rule text for one (language, category) pair, common rules included
fn patterns_for(language: Language, category: ThreatCategory) -> Vec<&'static str> {
    let specific: &[&str] = match (language, category) {
        (Language::JavaScript, ThreatCategory::FileSystem) => JS_FILESYSTEM,
        (Language::JavaScript, ThreatCategory::ProcessExecution) => JS_PROCESS,
        (Language::JavaScript, ThreatCategory::Network) => JS_NETWORK,
        (Language::JavaScript, ThreatCategory::DynamicEvaluation) => JS_EVALUATION,
        (Language::Python, ThreatCategory::FileSystem) => PY_FILESYSTEM,
        (Language::Python, ThreatCategory::ProcessExecution) => PY_PROCESS,
        (Language::Python, ThreatCategory::Network) => PY_NETWORK,
        (Language::Python, ThreatCategory::DynamicEvaluation) => PY_EVALUATION,
        (Language::Java, ThreatCategory::FileSystem) => JAVA_FILESYSTEM,
        (Language::Java, ThreatCategory::ProcessExecution) => JAVA_PROCESS,
        (Language::Java, ThreatCategory::Network) => JAVA_NETWORK,
        (Language::Java, ThreatCategory::DynamicEvaluation) => JAVA_EVALUATION,
        (Language::Go, ThreatCategory::FileSystem) => GO_FILESYSTEM,
        (Language::Go, ThreatCategory::ProcessExecution) => GO_PROCESS,
        (Language::Go, ThreatCategory::Network) => GO_NETWORK,
        (Language::Go, ThreatCategory::DynamicEvaluation) => GO_EVALUATION,
    };

    let common: &[&str] = match category {
        ThreatCategory::FileSystem => COMMON_FILESYSTEM,
        _ => &[],
    };

    specific.iter().chain(common.iter()).copied().collect()
}

struct CompiledRules {
    language: Language,
    category: ThreatCategory,
    patterns: Vec<&'static str>,
    set: RegexSet,
}

lazy_static! {
    static ref RULES: Vec<CompiledRules> = {
        let mut rules = Vec::new();
        for &language in Language::all_variants() {
            for category in ThreatCategory::ORDER {
                let patterns = patterns_for(language, category);
                let set = RegexSet::new(&patterns).expect("classifier rules must compile");
                rules.push(CompiledRules { language, category, patterns, set });
            }
        }
        rules
    };
}

/// Screen `code` written in `language`
pub fn check(code: &str, language: Language) -> Verdict {
    // RULES is built in ThreatCategory::ORDER per language
    for rules in RULES.iter().filter(|r| r.language == language) {
        if let Some(idx) = rules.set.matches(code).iter().next() {
            return Verdict::Unsafe {
                category: rules.category,
                rule: rules.patterns[idx],
            };
        }
    }
    Verdict::Safe
}
