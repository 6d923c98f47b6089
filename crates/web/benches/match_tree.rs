use criterion::{Criterion, black_box, criterion_group, criterion_main};
use strand_web::MatchTree;

const ROUTES: &[&str] = &[
    "/",
    "/login",
    "/logout",
    "/users",
    "/users/:username",
    "/users/:username/groups",
    "/users/:username/groups/:groupname",
    "/repos/:owner/:repo",
    "/repos/:owner/:repo/issues/:number",
    "/repos/:owner/:repo/pulls/:number/files",
    "/static/*",
    "/*",
];

fn tree() -> MatchTree<usize> {
    let mut tree = MatchTree::new();
    for (i, route) in ROUTES.iter().enumerate() {
        tree.add_terminal(route, i).unwrap();
    }
    tree.rebuild();
    tree
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_route_automaton", |b| b.iter(|| black_box(tree().node_count())));
}

fn bench_match(c: &mut Criterion) {
    let tree = tree();
    for path in ["/login", "/users/alice/groups/admins", "/repos/strand-rs/strand/pulls/42/files", "/static/js/app.min.js"] {
        c.bench_function(&format!("match {path}"), |b| {
            b.iter(|| {
                let mut found = 0;
                tree.match_path(black_box(path), |index, vars| found += index + vars.len());
                black_box(found)
            })
        });
    }
}

criterion_group!(benches, bench_build, bench_match);
criterion_main!(benches);
