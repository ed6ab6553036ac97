use pretty_assertions::assert_eq;

use crate::parser::debug_dump;
use crate::{
    parse_java, AstNode, ClassDeclaration, CompilationUnit, FieldAccessExpression,
    CatchClause, FieldDeclaration, InstanceofExpression, LambdaExpression, MethodCallExpression,
    MethodDeclaration, NameExpression, NewExpression, Resource, SyntaxKind,
};

const SAMPLE: &str = r#"package source;

import java.util.List;
import static java.lang.Math.max;

/** Sample. */
public class Source<T extends Comparable<T>> extends Base implements Runnable, java.io.Serializable {
    private int a = 1, b[] = {1, 2};
    protected List<List<String>> names;

    public Source() { this(0); }
    Source(int a) { super(); this.a = a; }

    @Override
    public void run() {
        for (int i = 0; i < a; i++) { System.out.println(names.get(i)); }
        for (String s : names.get(0)) { s.length(); }
        int[] xs = new int[3];
        Runnable r = () -> System.out.println(this.a);
        Object o = (Object) new Source<>() { };
        if (o instanceof Source<?> other) { other.run(); }
        String name = switch (a) { case 1 -> "one"; default -> { yield "many"; } };
        Class<?> c = String.class;
        java.util.function.Function<String, Integer> f = String::length;
        a += max(a, 2) >> 1;
    }
}
"#;

#[test]
fn parse_is_lossless() {
    let result = parse_java(SAMPLE);
    assert_eq!(result.syntax().to_string(), SAMPLE);

    let from_tokens: String = result.tokens.iter().map(|t| t.text(SAMPLE)).collect();
    assert_eq!(from_tokens, SAMPLE);
}

#[test]
fn sample_parses_without_errors() {
    let result = parse_java(SAMPLE);
    assert_eq!(result.errors, Vec::new(), "{}", debug_dump(&result.syntax()));
}

#[test]
fn garbage_input_is_still_lossless() {
    let input = "class { void ) ( } int ;; @ # \"unterminated\n}}}";
    let result = parse_java(input);
    assert!(!result.errors.is_empty());
    assert_eq!(result.syntax().to_string(), input);
}

#[test]
fn nested_type_arguments_split_shift_tokens() {
    let input = "class A { List<List<String>> x; }";
    let result = parse_java(input);
    assert_eq!(result.errors, Vec::new());
    let greaters = result
        .tokens
        .iter()
        .filter(|t| t.kind == SyntaxKind::Greater)
        .count();
    assert_eq!(greaters, 2);
    assert!(result
        .tokens
        .iter()
        .all(|t| t.kind != SyntaxKind::RightShift));
}

#[test]
fn top_level_accessors() {
    let result = parse_java(SAMPLE);
    let unit = CompilationUnit::cast(result.syntax()).unwrap();
    assert_eq!(unit.package().unwrap().name().unwrap().text(), "source");

    let imports: Vec<_> = unit
        .imports()
        .map(|i| (i.name().unwrap().text(), i.is_static()))
        .collect();
    assert_eq!(
        imports,
        vec![
            ("java.util.List".to_string(), false),
            ("java.lang.Math.max".to_string(), true),
        ]
    );

    let class = unit
        .type_declarations()
        .find_map(ClassDeclaration::cast)
        .unwrap();
    assert_eq!(class.name_token().unwrap().text(), "Source");
    assert!(class.modifiers().unwrap().has(SyntaxKind::PublicKw));

    let body = class.body().unwrap();
    let fields: Vec<Vec<String>> = body
        .fields()
        .map(|f| f.declarators().map(|d| d.name_token().unwrap().text().to_string()).collect())
        .collect();
    assert_eq!(fields, vec![vec!["a".to_string(), "b".to_string()], vec!["names".to_string()]]);
    assert_eq!(body.constructors().count(), 2);

    let run = body.methods().next().unwrap();
    assert_eq!(run.name_token().unwrap().text(), "run");
    assert!(run.is_void());
    assert!(run.return_type().is_none());
}

#[test]
fn member_call_and_name_expression_shapes() {
    let input = "class A { void m() { x.foo(); a.b.c = 1; this.a = 2; new T(1).a = 3; bar(); } }";
    let result = parse_java(input);
    assert_eq!(result.errors, Vec::new());
    let root = result.syntax();

    let calls: Vec<_> = root.descendants().filter_map(MethodCallExpression::cast).collect();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].callee().unwrap().kind(),
        SyntaxKind::FieldAccessExpression
    );
    assert_eq!(calls[1].callee().unwrap().kind(), SyntaxKind::NameExpression);

    let names: Vec<Vec<String>> = root
        .descendants()
        .filter_map(NameExpression::cast)
        .map(|n| n.segments().map(|t| t.text().to_string()).collect())
        .collect();
    assert!(names.contains(&vec!["a".to_string(), "b".to_string(), "c".to_string()]));

    let accesses: Vec<_> = root
        .descendants()
        .filter_map(FieldAccessExpression::cast)
        .map(|f| (f.receiver().unwrap().kind(), f.name_token().unwrap().text().to_string()))
        .collect();
    assert_eq!(
        accesses,
        vec![
            (SyntaxKind::NameExpression, "foo".to_string()),
            (SyntaxKind::ThisExpression, "a".to_string()),
            (SyntaxKind::NewExpression, "a".to_string()),
        ]
    );

    let new_expr = root.descendants().find_map(NewExpression::cast).unwrap();
    assert_eq!(new_expr.ty().unwrap().simple_name().as_deref(), Some("T"));
    assert_eq!(new_expr.argument_list().unwrap().arguments().count(), 1);
}

#[test]
fn explicit_constructor_calls_are_method_calls_on_this_and_super() {
    let input = "class A { A() { this(1); } A(int x) { super(); } }";
    let result = parse_java(input);
    assert_eq!(result.errors, Vec::new());
    let callee_kinds: Vec<_> = result
        .syntax()
        .descendants()
        .filter_map(MethodCallExpression::cast)
        .map(|c| c.callee().unwrap().kind())
        .collect();
    assert_eq!(
        callee_kinds,
        vec![SyntaxKind::ThisExpression, SyntaxKind::SuperExpression]
    );
}

#[test]
fn token_spans_skip_trivia() {
    let input = "class A { int x; }";
    let result = parse_java(input);
    let field = result
        .syntax()
        .descendants()
        .find_map(FieldDeclaration::cast)
        .unwrap();
    assert_eq!(result.node_token_span(field.syntax()), Some((6, 9)));

    let name = field.declarators().next().unwrap().name_token().unwrap();
    assert_eq!(result.token_index(&name), Some(8));
}

#[test]
fn parameter_lists_with_generics_and_varargs() {
    let input = "class A { public <T> void m(final Map<String, T> m, int... rest) throws E1, E2 {} }";
    let result = parse_java(input);
    assert_eq!(result.errors, Vec::new());
    let method = result
        .syntax()
        .descendants()
        .find_map(MethodDeclaration::cast)
        .unwrap();
    let params: Vec<_> = method
        .parameter_list()
        .unwrap()
        .parameters()
        .map(|p| (p.ty().unwrap().text(), p.name_token().unwrap().text().to_string(), p.is_varargs()))
        .collect();
    assert_eq!(
        params,
        vec![
            ("Map<String,T>".to_string(), "m".to_string(), false),
            ("int".to_string(), "rest".to_string(), true),
        ]
    );
}

#[test]
fn local_classes_and_nested_types_get_their_own_nodes() {
    let input = "class A { class B {} void m() { class C {} C c = new C(); } }";
    let result = parse_java(input);
    assert_eq!(result.errors, Vec::new());
    let kinds: Vec<_> = result.syntax().descendants().map(|n| n.kind()).collect();
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == SyntaxKind::ClassDeclaration)
            .count(),
        3
    );
    assert!(kinds.contains(&SyntaxKind::LocalTypeDeclarationStatement));
    assert!(kinds.contains(&SyntaxKind::LocalVariableDeclarationStatement));
}

#[test]
fn lambda_parameters_with_and_without_types() {
    let input = "class A { void m() { f(a -> a); g((x, y) -> x); h((final Map<String, List<T>> m, int n) -> m); } }";
    let result = parse_java(input);
    assert_eq!(result.errors, Vec::new());
    let bindings: Vec<Vec<(String, String)>> = result
        .syntax()
        .descendants()
        .filter_map(LambdaExpression::cast)
        .map(|lambda| {
            lambda
                .parameters()
                .unwrap()
                .bindings()
                .into_iter()
                .map(|(ty, name)| (ty, name.text().to_string()))
                .collect()
        })
        .collect();
    assert_eq!(
        bindings,
        vec![
            vec![(String::new(), "a".to_string())],
            vec![(String::new(), "x".to_string()), (String::new(), "y".to_string())],
            vec![
                ("Map<String,List<T>>".to_string(), "m".to_string()),
                ("int".to_string(), "n".to_string()),
            ],
        ]
    );
}

#[test]
fn catch_resource_and_pattern_bindings() {
    let input = "class A { void m(Object o) { try (Reader r = open()) { if (o instanceof String s) {} } catch (IOException | RuntimeException e) {} } }";
    let result = parse_java(input);
    assert_eq!(result.errors, Vec::new());
    let root = result.syntax();

    let catch = root.descendants().find_map(CatchClause::cast).unwrap();
    assert_eq!(catch.name_token().unwrap().text(), "e");
    assert_eq!(
        catch.types().map(|t| t.text()).collect::<Vec<_>>(),
        vec!["IOException", "RuntimeException"]
    );

    let resource = root.descendants().find_map(Resource::cast).unwrap();
    assert_eq!(resource.ty().unwrap().text(), "Reader");
    assert_eq!(resource.declarator().unwrap().name_token().unwrap().text(), "r");

    let pattern = root.descendants().find_map(InstanceofExpression::cast).unwrap();
    assert_eq!(pattern.ty().unwrap().text(), "String");
    assert_eq!(pattern.binding_token().unwrap().text(), "s");
}

#[test]
fn statements_without_bindings_share_one_kind() {
    let input = r#"@interface Marker { int value() default 1; }
class A extends B implements C, D {
    int m(int[] xs) throws IOException {
        outer:
        for (int i = 0; i < xs.length; i++) {
            if (xs[i] > 0) continue outer; else break;
        }
        while (true) { do { ; } while (false); }
        synchronized (this) { assert xs != null : "xs"; }
        switch (xs.length) { case 0: return 0; default: throw new IllegalStateException(); }
        int k = switch (xs.length) { case 1 -> 1; default -> { yield (int) xs[0]; } };
        Class<?> c = A.class;
        k += k > 0 ? -k : k++;
        return k;
    }
}
"#;
    let result = parse_java(input);
    assert_eq!(result.errors, Vec::new(), "{}", debug_dump(&result.syntax()));

    let root = result.syntax();
    let count = |kind: SyntaxKind| root.descendants().filter(|n| n.kind() == kind).count();
    assert_eq!(count(SyntaxKind::InterfaceDeclaration), 1);
    assert_eq!(count(SyntaxKind::ClassDeclaration), 1);
    assert_eq!(count(SyntaxKind::TypeClause), 3);
    assert_eq!(count(SyntaxKind::ForStatement), 1);
    assert_eq!(count(SyntaxKind::SwitchBlock), 2);
    assert_eq!(count(SyntaxKind::LocalVariableDeclarationStatement), 3);
    assert_eq!(count(SyntaxKind::UnaryExpression), 4);

    let statements: Vec<_> = root
        .descendants()
        .filter(|n| n.kind() == SyntaxKind::Statement)
        .filter_map(|n| n.first_token())
        .map(|t| t.text().to_string())
        .collect();
    for keyword in [
        "outer", "if", "continue", "break", "while", "do", ";", "synchronized", "assert", "switch",
        "return", "throw", "yield", "k",
    ] {
        assert!(
            statements.iter().any(|s| s == keyword),
            "no statement starting with {keyword:?} in {statements:?}"
        );
    }
}
