use criterion::criterion_main;


criterion_main!(validation::benches_validation, flag::benches_flag);
