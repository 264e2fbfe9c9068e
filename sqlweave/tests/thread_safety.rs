//! Compile-time checks that rendering state can be shared across threads.

use sqlweave::{
    Catalog, Condition, DialectConfig, Insert, Mssql, ParamBinder, Query, QueryBuilder,
    RenderResult, SqlError, Upsert,
};
use static_assertions::assert_impl_all;

assert_impl_all!(QueryBuilder<'static>: Send, Sync, Copy);
assert_impl_all!(DialectConfig: Send, Sync, Clone);
assert_impl_all!(Mssql: Send, Sync, Copy);
assert_impl_all!(Catalog: Send, Sync);
assert_impl_all!(Query: Send, Sync, Clone);
assert_impl_all!(Insert: Send, Sync, Clone);
assert_impl_all!(Upsert: Send, Sync, Clone);
assert_impl_all!(Condition: Send, Sync, Clone);
assert_impl_all!(ParamBinder: Send);
assert_impl_all!(RenderResult: Send, Sync);
assert_impl_all!(SqlError: Send, Sync, std::error::Error);

#[test]
fn test_builder_shared_between_threads() {
    let catalog = Catalog::new();
    let builder = QueryBuilder::new(&Mssql).with_schema(&catalog);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                scope.spawn(move || {
                    let query = Query::new().from("t").filter(Condition::eq("id", i));
                    builder.build(&query).unwrap()
                })
            })
            .collect();
        for handle in handles {
            let result = handle.join().unwrap();
            assert_eq!(result.sql, "SELECT * FROM [t] WHERE [id]=:qp0");
        }
    });
}
