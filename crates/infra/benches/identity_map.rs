use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ghostmap_core::{Entity, Ghost, Lifecycle, Registrable};
use ghostmap_infra::{
    BindError, BoundStatement, Database, DecodeError, EntityCodec, ExecContext, IdentityMap,
    InMemoryDatabase, Mapper, MapperSettings, Row, Statements,
};
use std::sync::Arc;

#[derive(Debug)]
struct Item {
    id: i64,
    label: String,
    lifecycle: Lifecycle,
}

impl Entity for Item {
    type Id = i64;

    fn id(&self) -> &i64 {
        &self.id
    }
}

impl Registrable for Item {}

impl Ghost for Item {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

struct ItemCodec;

impl EntityCodec<Item> for ItemCodec {
    fn decode(&self, row: &Row) -> Result<Item, DecodeError> {
        Ok(Item {
            id: row.get(0)?,
            label: row.get(1)?,
            lifecycle: Lifecycle::loaded(),
        })
    }

    fn bind_insert(&self, obj: &Item, stmt: &mut BoundStatement) -> Result<(), BindError> {
        stmt.append(obj.id).append(obj.label.as_str());
        Ok(())
    }

    fn bind_update(&self, obj: &Item, stmt: &mut BoundStatement) -> Result<(), BindError> {
        self.bind_insert(obj, stmt)
    }

    fn populate(&self, _obj: &Item, _row: &Row) -> Result<(), DecodeError> {
        Ok(())
    }
}

const ROWS: i64 = 1_000;

fn seeded_database(rt: &tokio::runtime::Runtime) -> Arc<InMemoryDatabase> {
    let db = InMemoryDatabase::new();
    db.create_table("ITEM", &["ID", "LABEL"]);
    rt.block_on(async {
        for id in 0..ROWS {
            db.execute(
                "INSERT INTO ITEM (ID, LABEL) VALUES ($1, $2)",
                &[id.into(), format!("item-{id}").into()],
            )
            .await
            .unwrap();
        }
    });
    Arc::new(db)
}

fn mapper(db: Arc<InMemoryDatabase>) -> Mapper<Item> {
    Mapper::new(
        db,
        Statements::new(
            "SELECT ID, LABEL FROM ITEM WHERE ID = $1",
            "INSERT INTO ITEM (ID, LABEL) VALUES ($1, $2)",
            "UPDATE ITEM SET LABEL = $2 WHERE ID = $1",
            "DELETE FROM ITEM WHERE ID = $1",
        ),
        ItemCodec,
        MapperSettings::default(),
    )
}

/// Cached `find` versus a `find` that has to query the database.
fn bench_find_hit_vs_miss(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let db = seeded_database(&rt);
    let ctx = ExecContext::background();

    let mut group = c.benchmark_group("find");

    let warm = mapper(db.clone());
    rt.block_on(async {
        for id in 0..ROWS {
            warm.find(&ctx, &id).await.unwrap();
        }
    });
    group.bench_function("identity_map_hit", |b| {
        let mut id = 0;
        b.iter(|| {
            id = (id + 1) % ROWS;
            rt.block_on(warm.find(&ctx, black_box(&id))).unwrap()
        })
    });

    group.bench_function("database_read", |b| {
        let mut id = 0;
        b.iter(|| {
            // A fresh mapper per iteration keeps the identity map cold.
            let cold = mapper(db.clone());
            id = (id + 1) % ROWS;
            rt.block_on(cold.find(&ctx, black_box(&id))).unwrap()
        })
    });

    group.finish();
}

/// Raw identity-map lookup cost as the map grows.
fn bench_identity_map_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity_map_get");
    group.throughput(Throughput::Elements(1));

    for size in [10usize, 1_000, 100_000] {
        let map = IdentityMap::new();
        for key in 0..size {
            map.insert(key, Arc::new(key));
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut key = 0;
            b.iter(|| {
                key = (key + 7) % size;
                black_box(map.get(&key))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find_hit_vs_miss, bench_identity_map_get);
criterion_main!(benches);
