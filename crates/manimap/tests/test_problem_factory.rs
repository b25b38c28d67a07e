//! Problem assembly over orientation, joint and restricted blocks.

use manimap::prelude::*;
use manimap_core::sparse::CooMatrix;
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// `f(x) = (sum(x), 0, ..., 0)`.
#[derive(Debug)]
struct SumFunction {
    name: String,
    input: usize,
    output: usize,
    representation: Representation,
}

fn sum_function(name: &str, input: usize, output: usize, representation: Representation) -> FunctionRef<f64> {
    Arc::new(SumFunction {
        name: name.to_string(),
        input,
        output,
        representation,
    })
}

impl DifferentiableFunction<f64> for SumFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.input
    }

    fn output_size(&self) -> usize {
        self.output
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LINEAR
    }

    fn representation(&self) -> Representation {
        self.representation
    }

    fn compute(&self, x: &DVector<f64>, result: &mut DVector<f64>, _ws: &mut Workspace<f64>) -> Result<()> {
        self.check_input(x)?;
        result.fill(0.0);
        result[0] = x.sum();
        Ok(())
    }

    fn jacobian(&self, x: &DVector<f64>, jacobian: &mut Derivative<f64>, _ws: &mut Workspace<f64>) -> Result<()> {
        self.check_input(x)?;
        let mut coo = CooMatrix::new(self.output, self.input);
        for j in 0..self.input {
            coo.push(0, j, 1.0)?;
        }
        jacobian.assign_from_coo(&coo, 0.0)
    }

    fn hessian(
        &self,
        _x: &DVector<f64>,
        output_index: usize,
        hessian: &mut Derivative<f64>,
        _ws: &mut Workspace<f64>,
    ) -> Result<()> {
        self.check_output_index(output_index)?;
        hessian.set_zero();
        Ok(())
    }
}

fn real(n: usize) -> ManifoldRef<f64> {
    Arc::new(RealSpace::new(n))
}

struct Scenario {
    problem: Problem<f64>,
    r39: ManifoldRef<f64>,
}

fn robot_scenario(representation: Representation) -> Scenario {
    let f = sum_function("F(x) = sum(x)", 9, 1, representation);
    let g = sum_function("G(x) = sum(x)", 3, 1, representation);
    let h = sum_function("H(x) = sum(x)", 10, 4, representation);
    let i = sum_function("I(x) = sum(x)", 22, 1, representation);

    let pos = real(3);
    let ori: ManifoldRef<f64> = Arc::new(SO3::new());
    let joints = real(10);
    let r42 = real(42);
    let r39 = real(39);
    let prod2 = CartesianProduct::new(vec![r42.clone(), ori.clone(), r42.clone()]).into_ref();
    let prod3 = CartesianProduct::new(vec![r39.clone(), ori.clone(), r39.clone()]).into_ref();

    let mut factory = ManifoldProblemFactory::new();
    factory.add_constraint(f, &ori, Restriction::none());
    factory.add_constraint(h.clone(), &joints, Restriction::none());
    factory.add_constraint(h.clone(), &joints, Restriction::none());
    factory.add_constraint(g, &pos, Restriction::none());
    factory.add_constraint(
        i.clone(),
        &prod3,
        Restriction::on(&r39, 14, 3).and(&r39, 27, 10),
    );
    factory
        .add_constraint(h, &joints, Restriction::none())
        .set_bounds(vec![Interval::lower(25.0); 4])
        .unwrap();

    factory.set_objective(i, &prod2, Restriction::on(&r42, 14, 3).and(&r42, 27, 10));

    factory
        .add_argument_bounds(&r42, vec![Interval::new(-2.0, 2.0); 41])
        .unwrap();
    factory
        .add_argument_bounds(&r39, vec![Interval::new(-3.0, 3.0); 39])
        .unwrap();

    Scenario {
        problem: factory.get_problem().unwrap(),
        r39,
    }
}

fn check_robot_scenario(representation: Representation) {
    let Scenario { problem, .. } = robot_scenario(representation);

    assert_eq!(problem.input_size(), 22 + 42 + 39);
    assert_eq!(problem.tangent_size(), 3 + 10 + 3 + 39 + 42);
    assert_eq!(problem.constraints().len(), 6);

    let mut expected = vec![Interval::unbounded(); 22];
    expected.extend(vec![Interval::new(-3.0, 3.0); 39]);
    expected.extend(vec![Interval::new(-2.0, 2.0); 41]);
    expected.push(Interval::unbounded());
    assert_eq!(problem.argument_bounds(), expected.as_slice());
    assert!(problem.argument_scaling().iter().all(|&s| s == 1.0));

    let constraints = problem.constraints();
    assert_eq!(constraints[5].bounds, vec![Interval::lower(25.0); 4]);
    assert_eq!(constraints[1].bounds, vec![Interval::unbounded(); 4]);
    assert_eq!(constraints[3].scaling, vec![1.0]);

    // Linear in ambient coordinates, not along the rotation chart.
    assert!(!constraints[0].is_linear());
    assert!(constraints[1].is_linear());
    assert!(constraints[3].is_linear());
    assert!(!constraints[4].is_linear());

    for constraint in constraints {
        assert_eq!(constraint.function.input_size(), problem.input_size());
        assert_eq!(constraint.function.tangent_size(), problem.tangent_size());
        assert_eq!(constraint.function.representation(), representation);
    }
    assert_eq!(problem.objective().output_size(), 1);
    assert_eq!(problem.objective().input_size(), 103);
}

/// Point of the scenario's manifold: identity rotation, other
/// coordinates numbered.
fn scenario_point() -> DVector<f64> {
    let mut x = DVector::from_fn(103, |i, _| i as f64 / 10.0);
    x.rows_mut(0, 9).copy_from(&SO3::identity_point::<f64>());
    x
}

#[test]
fn test_factory_dense() {
    check_robot_scenario(Representation::Dense);
}

#[test]
fn test_factory_sparse() {
    check_robot_scenario(Representation::Sparse);
}

#[test]
fn test_restricted_constraint_derivatives() {
    let Scenario { problem, r39 } = robot_scenario(Representation::Sparse);
    let layout: Vec<_> = problem.manifold().factors().to_vec();
    assert!(same_manifold(&layout[3], &r39));

    let x = scenario_point();
    let mut ws = Workspace::new();
    let restricted = &problem.constraints()[4].function;

    let mut value = DVector::zeros(1);
    restricted.compute(&x, &mut value, &mut ws).unwrap();
    let identity_sum = 3.0;
    let r39_sum: f64 = (14..17).chain(27..37).map(|k| (22 + k) as f64 / 10.0).sum();
    approx::assert_relative_eq!(value[0], identity_sum + r39_sum, epsilon = 1e-12);

    let mut jac = restricted.jacobian_buffer();
    restricted.jacobian(&x, &mut jac, &mut ws).unwrap();
    let dense = jac.to_dense();
    let r39_tangent = 3 + 10 + 3;
    for col in 0..problem.tangent_size() {
        let kept = (r39_tangent + 14..r39_tangent + 17).contains(&col)
            || (r39_tangent + 27..r39_tangent + 37).contains(&col);
        let expected = if kept { 1.0 } else { 0.0 };
        approx::assert_abs_diff_eq!(dense[(0, col)], expected, epsilon = 1e-12);
    }
}

#[test]
fn test_dense_and_sparse_scenarios_agree() {
    let dense = robot_scenario(Representation::Dense).problem;
    let sparse = robot_scenario(Representation::Sparse).problem;
    let x = scenario_point();
    let mut ws = Workspace::new();

    let pairs = dense
        .constraints()
        .iter()
        .map(|c| &c.function)
        .zip(sparse.constraints().iter().map(|c| &c.function))
        .chain(std::iter::once((dense.objective(), sparse.objective())));
    for (d, s) in pairs {
        let mut jd = d.jacobian_buffer();
        let mut js = s.jacobian_buffer();
        d.jacobian(&x, &mut jd, &mut ws).unwrap();
        s.jacobian(&x, &mut js, &mut ws).unwrap();
        assert_eq!(js.representation(), Representation::Sparse);
        approx::assert_relative_eq!(jd.to_dense(), js.to_dense(), epsilon = 1e-12);
    }
}

#[test]
fn test_factory_without_objective() {
    for representation in [Representation::Dense, Representation::Sparse] {
        let f = sum_function("F(x) = sum(x)", 9, 1, representation);
        let h = sum_function("H(x) = sum(x)", 10, 4, representation);
        let ori: ManifoldRef<f64> = Arc::new(SO3::new());
        let joints = real(10);

        let mut factory = ManifoldProblemFactory::new();
        factory.add_constraint(f, &ori, Restriction::none());
        factory.add_constraint(h.clone(), &joints, Restriction::none());
        factory
            .add_constraint(h, &joints, Restriction::none())
            .set_scaling(vec![1.0; 4])
            .unwrap();

        let problem = factory.get_problem().unwrap();
        assert_eq!(problem.input_size(), 19);
        assert_eq!(problem.objective().name(), "zero");
        assert_eq!(problem.objective().tangent_size(), 13);
    }
}

#[test]
fn test_factory_without_constraints() {
    for representation in [Representation::Dense, Representation::Sparse] {
        let r22 = real(22);
        let mut factory = ManifoldProblemFactory::new();
        factory.set_objective(
            sum_function("I(x) = sum(x)", 22, 1, representation),
            &r22,
            Restriction::none(),
        );

        let problem = factory.get_problem().unwrap();
        assert_eq!(problem.objective().input_size(), 22);
        assert!(problem.constraints().is_empty());
    }
}

#[test]
fn test_mixed_output_sizes_fail_finalization() {
    let pos = real(3);
    let joints = real(10);
    let mut factory = ManifoldProblemFactory::new();
    factory
        .add_constraint(
            sum_function("G(x) = sum(x)", 3, 1, Representation::Dense),
            &pos,
            Restriction::none(),
        )
        .add(
            1.0,
            sum_function("H(x) = sum(x)", 10, 4, Representation::Dense),
            &joints,
            Restriction::none(),
        );

    let err = factory.get_problem().unwrap_err();
    assert_eq!(err, MapError::output_size_mismatch("H(x) = sum(x)", 4, 1));
    assert_eq!(
        err.to_string(),
        "function H(x) = sum(x) of output size 4 cannot be added to a sum of functions of output size 1"
    );
}

#[test]
fn test_bounds_of_wrong_length_are_rejected() {
    let joints = real(10);
    let mut factory = ManifoldProblemFactory::new();
    let result = factory
        .add_constraint(
            sum_function("H(x) = sum(x)", 10, 4, Representation::Dense),
            &joints,
            Restriction::none(),
        )
        .set_bounds(vec![Interval::lower(25.0); 3])
        .map(|_| ());
    assert!(matches!(result, Err(MapError::DimensionMismatch { .. })));

    assert!(factory
        .add_argument_bounds(&joints, vec![Interval::unbounded(); 11])
        .is_err());
}

#[test]
fn test_problem_sums_have_no_gradient() {
    let (r2, r3) = (real(2), real(3));
    let mut factory = ManifoldProblemFactory::new();
    factory.set_objective(
        sum_function("F(x) = sum(x)", 2, 1, Representation::Dense),
        &r2,
        Restriction::none(),
    );
    factory.add_constraint(
        sum_function("G(x) = sum(x)", 3, 1, Representation::Sparse),
        &r3,
        Restriction::none(),
    );
    let problem = factory.get_problem().unwrap();
    assert_eq!(problem.tangent_size(), 5);

    let x = DVector::from_element(5, 1.0);
    let mut ws = Workspace::new();
    let functions = std::iter::once(problem.objective())
        .chain(problem.constraints().iter().map(|c| &c.function));
    for (function, jacobian_sum) in functions.zip([2.0, 3.0]) {
        let mut grad = DVector::from_element(5, -1.0);
        let err = function.gradient(&x, 0, &mut grad, &mut ws).unwrap_err();
        assert!(matches!(err, MapError::Unsupported { .. }));
        assert_eq!(grad, DVector::from_element(5, -1.0));

        let mut jac = function.jacobian_buffer();
        function.jacobian(&x, &mut jac, &mut ws).unwrap();
        assert_eq!(jac.to_dense().sum(), jacobian_sum);
    }
}
