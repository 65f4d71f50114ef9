//! Per-language harness sources.
//!
//! A harness reads the test input as JSON from stdin, calls the candidate's
//! entry point and prints exactly one envelope line:
//!
//! ```text
//! \n<marker>{"ok":true,"value":...}
//! \n<marker>{"ok":true,"undefined":true}
//! \n<marker>{"ok":false,"error":"..."}
//! ```
//!
//! The marker is read from `JUDGE_RESULT_MARKER`. Everything else the
//! process prints is console output.

/// Appended to the candidate's JavaScript. Accepts `function solution`,
/// `module.exports = fn` or `module.exports.solution = fn`.
pub const JAVASCRIPT: &str = r#"
;(function __judgeHarness() {
  const marker = process.env.JUDGE_RESULT_MARKER || '';
  const emit = (envelope) => {
    process.stdout.write('\n' + marker + envelope + '\n', () => process.exit(0));
  };
  const describe = (err) => (err instanceof Error ? err.name + ': ' + err.message : String(err));
  const failure = (message) => JSON.stringify({ ok: false, error: message });

  let entry;
  if (typeof solution === 'function') entry = solution;
  else if (typeof module.exports === 'function') entry = module.exports;
  else if (module.exports && typeof module.exports.solution === 'function') entry = module.exports.solution;
  if (!entry) {
    emit(failure('solution(input) is not defined'));
    return;
  }

  let input;
  try {
    const raw = require('fs').readFileSync(0, 'utf8');
    input = raw.trim() === '' ? null : JSON.parse(raw);
  } catch (err) {
    emit(failure('Invalid input: ' + describe(err)));
    return;
  }

  Promise.resolve()
    .then(() => entry(input))
    .then(
      (value) => {
        if (value === undefined) return emit('{"ok":true,"undefined":true}');
        let encoded;
        try {
          encoded = JSON.stringify(value);
        } catch (err) {
          return emit(failure('Result is not serializable: ' + describe(err)));
        }
        if (encoded === undefined) return emit('{"ok":true,"undefined":true}');
        emit('{"ok":true,"value":' + encoded + '}');
      },
      (err) => emit(failure(describe(err)))
    );
})();
"#;

/// Appended to the candidate's Python module
pub const PYTHON: &str = r#"


def _judge_main():
    import json
    import os
    import sys

    marker = os.environ.get("JUDGE_RESULT_MARKER", "")
    try:
        raw = sys.stdin.read()
        data = json.loads(raw) if raw.strip() else None
        entry = globals().get("solution")
        if not callable(entry):
            raise NameError("solution(input) is not defined")
        value = entry(data)
        try:
            envelope = json.dumps({"ok": True, "value": value}, allow_nan=False)
        except (TypeError, ValueError) as exc:
            envelope = json.dumps({"ok": False, "error": "Result is not serializable: %s" % exc})
    except BaseException as exc:
        envelope = json.dumps({"ok": False, "error": "%s: %s" % (type(exc).__name__, exc)})
    sys.stdout.flush()
    sys.stdout.write("\n" + marker + envelope + "\n")
    sys.stdout.flush()


if __name__ == "__main__":
    _judge_main()
"#;

/// `Main.java`, compiled next to the candidate's `Solution.java`.
///
/// The entry point is located reflectively so `int solution(int)` and
/// `int[] solution(int[])` signatures work as well as `Object solution(Object)`.
pub const JAVA_MAIN: &str = r##"import java.io.ByteArrayOutputStream;
import java.io.InputStream;
import java.lang.reflect.Array;
import java.lang.reflect.InvocationTargetException;
import java.lang.reflect.Method;
import java.lang.reflect.Modifier;
import java.nio.charset.StandardCharsets;
import java.util.ArrayList;
import java.util.LinkedHashMap;
import java.util.List;
import java.util.Map;

public class Main {
    private static final Object UNDEFINED = new Object();

    public static void main(String[] args) {
        String marker = System.getenv("JUDGE_RESULT_MARKER");
        if (marker == null) marker = "";

        String envelope;
        try {
            Object input = new JudgeJson(readAll(System.in)).parseDocument();
            Object value = invoke(input);
            if (value == UNDEFINED) {
                envelope = "{\"ok\":true,\"undefined\":true}";
            } else {
                envelope = "{\"ok\":true,\"value\":" + JudgeJson.write(value) + "}";
            }
        } catch (Throwable t) {
            String message = t.getMessage() == null
                ? t.getClass().getName()
                : t.getClass().getName() + ": " + t.getMessage();
            envelope = "{\"ok\":false,\"error\":" + JudgeJson.quote(message) + "}";
        }

        System.out.flush();
        System.out.print("\n" + marker + envelope + "\n");
        System.out.flush();
        System.exit(0);
    }

    private static String readAll(InputStream in) throws Exception {
        ByteArrayOutputStream buffer = new ByteArrayOutputStream();
        byte[] chunk = new byte[8192];
        int n;
        while ((n = in.read(chunk)) != -1) {
            buffer.write(chunk, 0, n);
        }
        return new String(buffer.toByteArray(), StandardCharsets.UTF_8);
    }

    private static Object invoke(Object input) throws Throwable {
        Method target = null;
        for (Method m : Solution.class.getDeclaredMethods()) {
            if (m.getName().equals("solution") && m.getParameterCount() == 1) {
                target = m;
                break;
            }
        }
        if (target == null) {
            throw new NoSuchMethodException("Solution.solution(input) is not defined");
        }
        target.setAccessible(true);

        Object receiver = Modifier.isStatic(target.getModifiers())
            ? null
            : Solution.class.getDeclaredConstructor().newInstance();
        Object argument = coerce(input, target.getParameterTypes()[0]);

        try {
            Object result = target.invoke(receiver, new Object[] { argument });
            return target.getReturnType() == void.class ? UNDEFINED : result;
        } catch (InvocationTargetException e) {
            throw e.getCause();
        }
    }

    private static Object coerce(Object value, Class<?> type) {
        if (value instanceof List && type.isArray()) {
            List<?> list = (List<?>) value;
            Class<?> component = type.getComponentType();
            Object array = Array.newInstance(component, list.size());
            for (int i = 0; i < list.size(); i++) {
                Array.set(array, i, coerce(list.get(i), component));
            }
            return array;
        }
        if (!(value instanceof Number)) return value;
        Number n = (Number) value;
        if (type == int.class || type == Integer.class) return n.intValue();
        if (type == long.class || type == Long.class) return n.longValue();
        if (type == double.class || type == Double.class) return n.doubleValue();
        if (type == float.class || type == Float.class) return n.floatValue();
        return value;
    }
}

final class JudgeJson {
    private final String src;
    private int pos;

    JudgeJson(String src) {
        this.src = src;
    }

    Object parseDocument() {
        skipWhitespace();
        if (pos >= src.length()) return null;
        Object value = parseValue();
        skipWhitespace();
        if (pos != src.length()) {
            throw new IllegalArgumentException("Unexpected trailing input at " + pos);
        }
        return value;
    }

    private Object parseValue() {
        skipWhitespace();
        switch (peek()) {
            case '{': return parseObject();
            case '[': return parseArray();
            case '"': return parseString();
            case 't': expect("true"); return Boolean.TRUE;
            case 'f': expect("false"); return Boolean.FALSE;
            case 'n': expect("null"); return null;
            default: return parseNumber();
        }
    }

    private Map<String, Object> parseObject() {
        Map<String, Object> map = new LinkedHashMap<>();
        consume('{');
        skipWhitespace();
        if (peek() == '}') {
            pos++;
            return map;
        }
        while (true) {
            skipWhitespace();
            String key = parseString();
            skipWhitespace();
            consume(':');
            map.put(key, parseValue());
            skipWhitespace();
            if (peek() == ',') {
                pos++;
                continue;
            }
            consume('}');
            return map;
        }
    }

    private List<Object> parseArray() {
        List<Object> list = new ArrayList<>();
        consume('[');
        skipWhitespace();
        if (peek() == ']') {
            pos++;
            return list;
        }
        while (true) {
            list.add(parseValue());
            skipWhitespace();
            if (peek() == ',') {
                pos++;
                continue;
            }
            consume(']');
            return list;
        }
    }

    private String parseString() {
        consume('"');
        StringBuilder sb = new StringBuilder();
        while (true) {
            if (pos >= src.length()) throw new IllegalArgumentException("Unterminated string");
            char c = src.charAt(pos++);
            if (c == '"') return sb.toString();
            if (c != '\\') {
                sb.append(c);
                continue;
            }
            char e = src.charAt(pos++);
            switch (e) {
                case 'n': sb.append('\n'); break;
                case 't': sb.append('\t'); break;
                case 'r': sb.append('\r'); break;
                case 'b': sb.append('\b'); break;
                case 'f': sb.append('\f'); break;
                case 'u':
                    sb.append((char) Integer.parseInt(src.substring(pos, pos + 4), 16));
                    pos += 4;
                    break;
                default: sb.append(e);
            }
        }
    }

    private Object parseNumber() {
        int start = pos;
        while (pos < src.length() && "+-0123456789.eE".indexOf(src.charAt(pos)) >= 0) pos++;
        String text = src.substring(start, pos);
        if (text.isEmpty()) throw new IllegalArgumentException("Unexpected character at " + start);
        if (text.indexOf('.') < 0 && text.indexOf('e') < 0 && text.indexOf('E') < 0) {
            try {
                return Long.parseLong(text);
            } catch (NumberFormatException ignored) {
                // falls through to double
            }
        }
        return Double.parseDouble(text);
    }

    private char peek() {
        return pos < src.length() ? src.charAt(pos) : '\0';
    }

    private void consume(char c) {
        if (peek() != c) throw new IllegalArgumentException("Expected '" + c + "' at " + pos);
        pos++;
    }

    private void expect(String word) {
        if (!src.startsWith(word, pos)) throw new IllegalArgumentException("Expected " + word + " at " + pos);
        pos += word.length();
    }

    private void skipWhitespace() {
        while (pos < src.length() && Character.isWhitespace(src.charAt(pos))) pos++;
    }

    static String write(Object value) {
        StringBuilder sb = new StringBuilder();
        write(value, sb);
        return sb.toString();
    }

    private static void write(Object v, StringBuilder sb) {
        if (v == null) {
            sb.append("null");
        } else if (v instanceof Boolean) {
            sb.append(v.toString());
        } else if (v instanceof Double || v instanceof Float) {
            double d = ((Number) v).doubleValue();
            sb.append(Double.isNaN(d) || Double.isInfinite(d) ? "null" : Double.toString(d));
        } else if (v instanceof Number) {
            sb.append(v.toString());
        } else if (v instanceof CharSequence || v instanceof Character) {
            sb.append(quote(v.toString()));
        } else if (v instanceof Map) {
            sb.append('{');
            boolean first = true;
            for (Map.Entry<?, ?> entry : ((Map<?, ?>) v).entrySet()) {
                if (!first) sb.append(',');
                first = false;
                sb.append(quote(String.valueOf(entry.getKey()))).append(':');
                write(entry.getValue(), sb);
            }
            sb.append('}');
        } else if (v instanceof Iterable) {
            sb.append('[');
            boolean first = true;
            for (Object item : (Iterable<?>) v) {
                if (!first) sb.append(',');
                first = false;
                write(item, sb);
            }
            sb.append(']');
        } else if (v.getClass().isArray()) {
            sb.append('[');
            int n = Array.getLength(v);
            for (int i = 0; i < n; i++) {
                if (i > 0) sb.append(',');
                write(Array.get(v, i), sb);
            }
            sb.append(']');
        } else {
            sb.append(quote(v.toString()));
        }
    }

    static String quote(String s) {
        StringBuilder sb = new StringBuilder("\"");
        for (int i = 0; i < s.length(); i++) {
            char c = s.charAt(i);
            switch (c) {
                case '"': sb.append("\\\""); break;
                case '\\': sb.append("\\\\"); break;
                case '\n': sb.append("\\n"); break;
                case '\r': sb.append("\\r"); break;
                case '\t': sb.append("\\t"); break;
                default:
                    if (c < 0x20) sb.append(String.format("\\u%04x", (int) c));
                    else sb.append(c);
            }
        }
        return sb.append('"').toString();
    }
}
"##;

/// `main.go`, built together with the candidate's `solution.go`
pub const GO_MAIN: &str = r#"package main

import (
	"bytes"
	"encoding/json"
	"fmt"
	"io"
	"os"
)

func judgeEmit(marker string, envelope map[string]interface{}) {
	data, err := json.Marshal(envelope)
	if err != nil {
		data, _ = json.Marshal(map[string]interface{}{
			"ok":    false,
			"error": "Result is not serializable: " + err.Error(),
		})
	}
	fmt.Fprintf(os.Stdout, "\n%s%s\n", marker, data)
}

func judgeInvoke(input interface{}) (envelope map[string]interface{}) {
	defer func() {
		if r := recover(); r != nil {
			envelope = map[string]interface{}{"ok": false, "error": fmt.Sprint("panic: ", r)}
		}
	}()
	return map[string]interface{}{"ok": true, "value": Solution(input)}
}

func main() {
	marker := os.Getenv("JUDGE_RESULT_MARKER")

	raw, err := io.ReadAll(os.Stdin)
	if err != nil {
		judgeEmit(marker, map[string]interface{}{"ok": false, "error": "Invalid input: " + err.Error()})
		return
	}

	var input interface{}
	if len(bytes.TrimSpace(raw)) > 0 {
		if err := json.Unmarshal(raw, &input); err != nil {
			judgeEmit(marker, map[string]interface{}{"ok": false, "error": "Invalid input: " + err.Error()})
			return
		}
	}

	judgeEmit(marker, judgeInvoke(input))
}
"#;

pub const GO_MOD: &str = "module solution\n\ngo 1.18\n";
