//! Benchmarks for retrieval_oem.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{DMatrix, DVector};
use retrieval_core::{ForwardModel, LinearForwardModel};
use retrieval_oem::{GaussNewton, LevenbergMarquardt, LinearForm, LinearOem};

fn test_problem(m: usize, n: usize) -> (DVector<f64>, DVector<f64>, DMatrix<f64>, DMatrix<f64>, DMatrix<f64>) {
    let k = DMatrix::from_fn(m, n, |i, j| 1.0 / (1.0 + (i + 2 * j) as f64));
    let y = DVector::from_fn(m, |i, _| (i as f64 * 0.7).sin());
    let xa = DVector::zeros(n);
    let se = DMatrix::identity(m, m) * 0.1;
    let sa = DMatrix::identity(n, n);
    (y, xa, k, se, sa)
}

fn benchmark_linear_forms(c: &mut Criterion) {
    let (y, xa, k, se, sa) = test_problem(40, 25);

    c.bench_function("linear_oem_n_form", |b| {
        let solver = LinearOem::new(LinearForm::NForm);
        b.iter(|| solver.solve(black_box(&y), &xa, &k, &se, &sa))
    });

    c.bench_function("linear_oem_m_form", |b| {
        let solver = LinearOem::new(LinearForm::MForm);
        b.iter(|| solver.solve(black_box(&y), &xa, &k, &se, &sa))
    });
}

/// y_i = exp(x_i): diagonal, strongly nonlinear.
struct ExpModel;

impl ForwardModel for ExpModel {
    fn evaluate(&mut self, x: &DVector<f64>) -> DVector<f64> {
        x.map(f64::exp)
    }

    fn evaluate_jacobian(&mut self, x: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
        let y = x.map(f64::exp);
        let k = DMatrix::from_diagonal(&y);
        (y, k)
    }
}

fn benchmark_nonlinear_solvers(c: &mut Criterion) {
    let n = 10;
    let y = DVector::from_element(n, 2.0);
    let xa = DVector::zeros(n);
    let se = DMatrix::identity(n, n) * 0.01;
    let sa = DMatrix::identity(n, n);

    c.bench_function("gauss_newton_exp_model", |b| {
        let solver = GaussNewton::new();
        b.iter(|| solver.solve(black_box(&mut ExpModel), &y, &xa, &se, &sa))
    });

    c.bench_function("levenberg_marquardt_exp_model", |b| {
        let solver = LevenbergMarquardt::new();
        b.iter(|| solver.solve(black_box(&mut ExpModel), &y, &xa, &se, &sa))
    });

    c.bench_function("gauss_newton_linear_model", |b| {
        let (y, xa, k, se, sa) = test_problem(40, 25);
        let solver = GaussNewton::new();
        let mut model = LinearForwardModel::new(k);
        b.iter(|| solver.solve(black_box(&mut model), &y, &xa, &se, &sa))
    });
}

criterion_group!(benches, benchmark_linear_forms, benchmark_nonlinear_solvers);
criterion_main!(benches);
